//! Choosing a username before any network activity.
//!
//! The identity comes from one of three places, in order:
//!
//! 1. `--username <name>` on the command line,
//! 2. `--generate`, which picks a random `<Adjective><Noun><4 digits>` name,
//! 3. an interactive prompt, where `/generate` proposes a random name that
//!    the user accepts with Enter or overrides by typing another one.
//!
//! Blank input is refused at the prompt and the question is asked again.

use peerchat_core::{generate_username_with, IdentityError, PeerIdentity};
use rand::Rng;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Prompt input that asks for a generated name.
pub const GENERATE_COMMAND: &str = "/generate";

/// Errors that stop onboarding.
#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error(transparent)]
    InvalidUsername(#[from] IdentityError),

    /// Input ended before a name was chosen.
    #[error("no username chosen")]
    Aborted,

    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves the identity from command-line flags, if they decide it.
///
/// Returns `Ok(None)` when neither flag is set and the user must be asked.
///
/// # Errors
///
/// Returns [`OnboardingError::InvalidUsername`] for a blank `--username`.
pub fn identity_from_flags<R: Rng + ?Sized>(
    username: Option<&str>,
    generate: bool,
    rng: &mut R,
) -> Result<Option<PeerIdentity>, OnboardingError> {
    if let Some(name) = username {
        return Ok(Some(PeerIdentity::parse(name)?));
    }
    if generate {
        return Ok(Some(generate_username_with(rng)));
    }
    Ok(None)
}

/// Asks for a username on `input`/`output` until a valid one is given.
///
/// # Errors
///
/// [`OnboardingError::Aborted`] if `input` ends first, or an I/O error.
pub async fn prompt_identity<I, O, R>(
    input: &mut I,
    output: &mut O,
    rng: &mut R,
) -> Result<PeerIdentity, OnboardingError>
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
    R: Rng + ?Sized,
{
    let mut suggestion: Option<PeerIdentity> = None;
    let mut line = String::new();

    loop {
        match &suggestion {
            Some(name) => {
                output
                    .write_all(
                        format!("How about {name}? Press Enter to accept or type another name: ")
                            .as_bytes(),
                    )
                    .await?
            }
            None => {
                output
                    .write_all(b"Choose a username (or /generate for a random one): ")
                    .await?
            }
        }
        output.flush().await?;

        line.clear();
        if input.read_line(&mut line).await? == 0 {
            return Err(OnboardingError::Aborted);
        }
        let answer = line.trim();

        if answer == GENERATE_COMMAND {
            suggestion = Some(generate_username_with(rng));
            continue;
        }
        if answer.is_empty() {
            if let Some(name) = suggestion.take() {
                return Ok(name);
            }
            output.write_all(b"Username must not be empty.\n").await?;
            continue;
        }
        return Ok(PeerIdentity::parse(answer)?);
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(3)
    }

    #[test]
    fn test_username_flag_wins_and_is_trimmed() {
        let id = identity_from_flags(Some("  Alice "), true, &mut rng()).unwrap();
        assert_eq!(id.unwrap().as_str(), "Alice");
    }

    #[test]
    fn test_blank_username_flag_is_rejected() {
        assert!(matches!(
            identity_from_flags(Some("   "), false, &mut rng()),
            Err(OnboardingError::InvalidUsername(IdentityError::Empty))
        ));
    }

    #[test]
    fn test_generate_flag_uses_rng() {
        let expected = generate_username_with(&mut rng());
        let id = identity_from_flags(None, true, &mut rng()).unwrap();
        assert_eq!(id, Some(expected));
    }

    #[test]
    fn test_no_flags_defers_to_prompt() {
        assert_eq!(identity_from_flags(None, false, &mut rng()).unwrap(), None);
    }

    #[tokio::test]
    async fn test_prompt_refuses_blank_lines_then_accepts_name() {
        // Arrange
        let mut input: &[u8] = b"\n   \n  Alice  \n";
        let mut output = Vec::new();

        // Act
        let id = prompt_identity(&mut input, &mut output, &mut rng()).await.unwrap();

        // Assert
        assert_eq!(id.as_str(), "Alice");
        let shown = String::from_utf8(output).unwrap();
        assert_eq!(shown.matches("Username must not be empty.").count(), 2);
    }

    #[tokio::test]
    async fn test_prompt_generate_then_enter_accepts_suggestion() {
        let mut input: &[u8] = b"/generate\n\n";
        let mut output = Vec::new();
        let expected = generate_username_with(&mut rng());

        let id = prompt_identity(&mut input, &mut output, &mut rng()).await.unwrap();

        assert_eq!(id, expected);
        assert!(String::from_utf8(output).unwrap().contains(expected.as_str()));
    }

    #[tokio::test]
    async fn test_prompt_generate_can_be_overridden() {
        let mut input: &[u8] = b"/generate\nBob\n";
        let mut output = Vec::new();

        let id = prompt_identity(&mut input, &mut output, &mut rng()).await.unwrap();

        assert_eq!(id.as_str(), "Bob");
    }

    #[tokio::test]
    async fn test_prompt_aborts_on_end_of_input() {
        let mut input: &[u8] = b"  \n";
        let mut output = Vec::new();

        let result = prompt_identity(&mut input, &mut output, &mut rng()).await;

        assert!(matches!(result, Err(OnboardingError::Aborted)));
    }
}
