use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    InvalidLength { len: usize },
    InvalidChar { index: usize, char: char },
    InvalidLatinSquare,
    DimensionMismatch { expected: usize, found: usize },
    NotATaxicab,
    NotDiagonalizable,
    MissingValue { side: char, row: usize, value: usize },
    Overflow,
    ZeroExponent,
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidLength { len } => {
                write!(f, "Invalid len: {len}, expected a square number")
            }
            Error::InvalidChar { index, char } => {
                write!(f, "Invalid char at index {index}: {char}")
            }
            Error::InvalidLatinSquare => write!(f, "The latin square property is not met"),
            Error::DimensionMismatch { expected, found } => {
                write!(f, "Dimension mismatch: expected {expected}, found {found}")
            }
            Error::NotATaxicab => write!(f, "The rows do not share the same power sum"),
            Error::NotDiagonalizable => write!(
                f,
                "The two selections cannot be placed on both diagonals at once"
            ),
            Error::MissingValue { side, row, value } => write!(
                f,
                "{side}: latin square with no {value} in row {row}, the family is corrupted"
            ),
            Error::Overflow => write!(f, "Power sum does not fit in 128 bits"),
            Error::ZeroExponent => write!(f, "The exponent must be positive"),
        }
    }
}

impl std::error::Error for Error {}
