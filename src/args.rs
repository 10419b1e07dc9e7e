use std::str::FromStr;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pow_magic_squares")]
#[command(version)]
#[command(about = "Search for magic squares of d-th powers")]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Seed for every randomized search
    #[arg(long, default_value_t = 69)]
    pub seed: u64,

    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Clone)]
pub enum Mode {
    /// Print the Latin squares of side n whose first row is 0, 1, ..., n - 1
    Latin {
        n: usize,

        /// Stop after this many squares
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Count the Latin squares of side n whose first row is 0, 1, ..., n - 1
    CountLatin { n: usize },

    /// Exhaustive search for a magic square of d-th powers
    Search {
        /// Side length
        #[arg(long)]
        n: usize,

        /// Exponent
        #[arg(long, default_value_t = 2)]
        d: u32,

        /// Largest base to try
        #[arg(long)]
        max_base: u64,

        /// Bases of the first cells, row-major (comma-separated)
        #[arg(long, value_delimiter = ',')]
        prefix: Vec<u64>,
    },

    /// Build a semi-magic grid from two taxicab tuples and move two balanced
    /// selections onto its diagonals
    Assemble {
        /// (r, s, d) tuple, representations separated by ';', terms by ','
        #[arg(long)]
        a: TermRows,

        /// (s, r, d) tuple in the same format
        #[arg(long)]
        b: TermRows,

        /// Exponent
        #[arg(long, default_value_t = 2)]
        d: u32,

        /// Distinct selections the collision search has to find
        #[arg(long, default_value_t = 2)]
        required: usize,

        /// Attempts in a row without progress before the collision search gives up
        #[arg(long, default_value_t = 1 << 20)]
        max_stale: u64,

        /// Shortest partial selection worth storing
        #[arg(long, default_value_t = 1)]
        min_stored_len: usize,

        /// Collision searches to run, each on emptied tables
        #[arg(long, default_value_t = 1)]
        rounds: usize,

        /// Walk every balanced selection instead of the randomized collision search
        #[arg(long)]
        exhaustive_selections: bool,

        /// Row shuffles tried when no pair of families works
        #[arg(long, default_value_t = 0)]
        shuffle_budget: u64,
    },

    /// Print a square of d-th powers and report its line sums
    Check {
        /// Bases row by row, rows separated by ';', bases by ','
        #[arg(long)]
        rows: TermRows,

        /// Exponent
        #[arg(long, default_value_t = 2)]
        d: u32,
    },

    /// Print the siamese magic square of odd side n
    Siamese { n: usize },
}

/// Rows of a taxicab tuple, `"1,12;9,10"`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermRows(pub Vec<Vec<u64>>);

impl TermRows {
    pub fn as_rows(&self) -> Vec<&[u64]> {
        self.0.iter().map(Vec::as_slice).collect()
    }
}

impl FromStr for TermRows {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(';')
            .map(|row| {
                row.split(',')
                    .map(|term| {
                        term.trim()
                            .parse::<u64>()
                            .map_err(|e| format!("invalid term {term:?}: {e}"))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()
            .map(TermRows)
    }
}
