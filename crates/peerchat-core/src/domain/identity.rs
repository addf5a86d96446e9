//! Peer identity: the username that is also the network address.
//!
//! A [`PeerIdentity`] is registered verbatim with the signaling service, so it
//! is both what the other side sees as the sender name and what they type to
//! connect to you.  Uniqueness is by convention only; the signaling service
//! rejects a name that is already taken.
//!
//! # Generated names
//!
//! [`generate_username`] builds names such as `SwiftPhoenix4821`:
//!
//! ```text
//! <Adjective><Noun><4 digits>
//! ```
//!
//! The suffix is exactly four characters from `0-9`, leading zeros allowed.

use std::fmt;

use rand::Rng;
use thiserror::Error;

/// Adjectives used as the first word of a generated username.
pub const ADJECTIVES: [&str; 10] = [
    "Swift", "Bright", "Cosmic", "Digital", "Electric", "Quantum", "Solar", "Stellar", "Cyber",
    "Tech",
];

/// Nouns used as the second word of a generated username.
pub const NOUNS: [&str; 10] = [
    "Phoenix", "Dragon", "Nexus", "Pulse", "Wave", "Storm", "Star", "Nova", "Byte", "Core",
];

/// Number of numeric characters appended to a generated username.
pub const SUFFIX_LEN: usize = 4;

/// Errors produced when validating a username.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The input was empty or contained only whitespace.
    #[error("username must not be empty")]
    Empty,
}

/// A validated, trimmed, non-empty username.
///
/// Construct with [`PeerIdentity::parse`] or [`generate_username`].
///
/// # Examples
///
/// ```rust
/// use peerchat_core::PeerIdentity;
///
/// let id = PeerIdentity::parse("  Alice ").unwrap();
/// assert_eq!(id.as_str(), "Alice");
/// assert!(PeerIdentity::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerIdentity(String);

impl PeerIdentity {
    /// Trims `input` and accepts it if anything is left.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Empty`] for empty or whitespace-only input.
    pub fn parse(input: &str) -> Result<Self, IdentityError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(IdentityError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the username as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PeerIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Generates a random username using the thread-local RNG.
pub fn generate_username() -> PeerIdentity {
    generate_username_with(&mut rand::thread_rng())
}

/// Generates a random username from the supplied RNG.
///
/// Taking the RNG as a parameter lets tests use a seeded generator.
pub fn generate_username_with<R: Rng + ?Sized>(rng: &mut R) -> PeerIdentity {
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];

    let mut name = String::with_capacity(adjective.len() + noun.len() + SUFFIX_LEN);
    name.push_str(adjective);
    name.push_str(noun);
    for _ in 0..SUFFIX_LEN {
        let digit: u8 = rng.gen_range(0..10);
        name.push(char::from(b'0' + digit));
    }
    PeerIdentity(name)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Splits a generated name into (adjective, noun, suffix) if it has the
    /// expected shape.
    fn split_generated(name: &str) -> Option<(&str, &str, &str)> {
        let adjective = ADJECTIVES.iter().find(|a| name.starts_with(**a))?;
        let rest = &name[adjective.len()..];
        let noun = NOUNS.iter().find(|n| rest.starts_with(**n))?;
        let suffix = &rest[noun.len()..];
        Some((*adjective, *noun, suffix))
    }

    #[test]
    fn test_parse_trims_surrounding_whitespace() {
        // Arrange / Act
        let id = PeerIdentity::parse("\t Alice \n").expect("non-empty name");

        // Assert
        assert_eq!(id.as_str(), "Alice");
    }

    #[test]
    fn test_parse_rejects_empty_input() {
        assert_eq!(PeerIdentity::parse(""), Err(IdentityError::Empty));
    }

    #[test]
    fn test_parse_rejects_whitespace_only_input() {
        for input in [" ", "\t", "\n\n", "  \t  "] {
            assert_eq!(PeerIdentity::parse(input), Err(IdentityError::Empty), "{input:?}");
        }
    }

    #[test]
    fn test_parse_accepts_any_non_blank_text() {
        for input in ["a", "Bob 2", "名前", "x-y_z.42"] {
            let id = PeerIdentity::parse(input).expect("accepted");
            assert_eq!(id.as_str(), input);
        }
    }

    #[test]
    fn test_parse_keeps_inner_whitespace() {
        let id = PeerIdentity::parse("  Cosmic Kid  ").unwrap();
        assert_eq!(id.as_str(), "Cosmic Kid");
    }

    #[test]
    fn test_display_matches_as_str() {
        let id = PeerIdentity::parse("Alice").unwrap();
        assert_eq!(id.to_string(), "Alice");
    }

    #[test]
    fn test_generated_name_has_adjective_noun_and_four_digits() {
        // Arrange
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            // Act
            let id = generate_username_with(&mut rng);

            // Assert
            let (_, _, suffix) = split_generated(id.as_str())
                .unwrap_or_else(|| panic!("unexpected shape: {id}"));
            assert_eq!(suffix.len(), SUFFIX_LEN, "{id}");
            assert!(suffix.chars().all(|c| c.is_ascii_digit()), "{id}");
        }
    }

    #[test]
    fn test_generated_name_is_a_valid_identity() {
        let id = generate_username();
        assert_eq!(PeerIdentity::parse(id.as_str()), Ok(id));
    }

    #[test]
    fn test_same_seed_generates_same_name() {
        let a = generate_username_with(&mut StdRng::seed_from_u64(42));
        let b = generate_username_with(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_generation_eventually_uses_every_word() {
        // Arrange
        let mut rng = StdRng::seed_from_u64(1);
        let mut adjectives = std::collections::HashSet::new();
        let mut nouns = std::collections::HashSet::new();

        // Act
        for _ in 0..2000 {
            let id = generate_username_with(&mut rng);
            let (a, n, _) = split_generated(id.as_str()).unwrap();
            adjectives.insert(a.to_string());
            nouns.insert(n.to_string());
        }

        // Assert
        assert_eq!(adjectives.len(), ADJECTIVES.len());
        assert_eq!(nouns.len(), NOUNS.len());
    }
}
