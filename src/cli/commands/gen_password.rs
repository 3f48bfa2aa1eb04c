//! `gen-password` — print a random password.

use rand::Rng;

use crate::errors::Result;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Execute the `gen-password` command.
pub fn execute() -> Result<()> {
    println!("{}", generate(12));
    Ok(())
}

/// A random password containing at least one upper-case letter, one
/// lower-case letter, and one digit.
pub fn generate(len: usize) -> String {
    let mut rng = rand::rngs::OsRng;
    loop {
        let candidate: String = (0..len)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect();
        let has_upper = candidate.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = candidate.chars().any(|c| c.is_ascii_lowercase());
        let has_digit = candidate.chars().any(|c| c.is_ascii_digit());
        if has_upper && has_lower && has_digit {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_passwords_have_all_classes() {
        for _ in 0..20 {
            let pw = generate(12);
            assert_eq!(pw.len(), 12);
            assert!(pw.chars().any(|c| c.is_ascii_uppercase()));
            assert!(pw.chars().any(|c| c.is_ascii_lowercase()));
            assert!(pw.chars().any(|c| c.is_ascii_digit()));
        }
    }
}
