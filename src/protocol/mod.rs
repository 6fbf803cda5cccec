/// XInput2 client protocol implementation
///
/// This module implements the client side of the XInput2 wire protocol:
/// types, error kinds, the request writer and the hierarchy change records.

pub mod types;
pub mod errors;
pub mod encoder;
pub mod xinput2;

pub use types::*;
pub use errors::*;
pub use encoder::*;
pub use xinput2::*;

/// Padding helper - X11 requires data to be padded to 4-byte boundaries
pub fn pad(n: usize) -> usize {
    (4 - (n % 4)) % 4
}

/// Calculate padded length
pub fn padded_len(n: usize) -> usize {
    n + pad(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad() {
        assert_eq!(pad(0), 0);
        assert_eq!(pad(1), 3);
        assert_eq!(pad(4), 0);
        assert_eq!(pad(6), 2);
        assert_eq!(padded_len(6), 8);
        assert_eq!(padded_len(8), 8);
    }
}
