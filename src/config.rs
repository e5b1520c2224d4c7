//! Switches for the encoder pipeline.
//!
//! Everything that was tunable in the solver is collected in one value that
//! gets threaded through the encoder constructor, so there is no process-wide
//! mutable configuration.

/// Commander group size per puzzle order N. Entries below order 3 are 0,
/// which disables grouping and makes the encoder fall back to pairwise
/// clauses; group sizes of 0 or 1 would never terminate the recursion.
const COMMANDER_GROUP_SIZES: [usize; 16] = [0, 0, 0, 3, 4, 5, 4, 6, 4, 4, 3, 4, 6, 4, 4, 3];

#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Use the commander at-most-one encoding instead of naive pairwise clauses.
    pub commander_encoding: bool,
    /// Use the binary-tree commander variant instead of the k-ary one.
    pub commander_binary: bool,
    /// Also allocate commanders for single-literal groups.
    pub encode_extra_commanders: bool,
    /// Run constraint propagation on the puzzle before encoding.
    pub simple_solve: bool,
    /// Enable the pointing-candidates rule.
    pub pointing_candidates: bool,
    /// Enable the box-line-reduction rule.
    pub box_line_reduction: bool,
    /// Enable the x-wing rule. Disabled by default since it rarely finds
    /// anything the cheaper rules missed.
    pub x_wing: bool,
    /// Commander group size table, indexed by puzzle order.
    pub group_sizes: [usize; 16],
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            commander_encoding: true,
            commander_binary: false,
            encode_extra_commanders: false,
            simple_solve: true,
            pointing_candidates: true,
            box_line_reduction: true,
            x_wing: false,
            group_sizes: COMMANDER_GROUP_SIZES,
        }
    }
}

impl EncoderConfig {
    /// Commander group size for a puzzle of order `n`; 0 means grouping is
    /// not worthwhile (or not possible) at this order.
    pub fn group_size(&self, n: usize) -> usize {
        self.group_sizes.get(n).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_size_is_zero_outside_the_table() {
        let config = EncoderConfig::default();
        assert_eq!(config.group_size(2), 0);
        assert_eq!(config.group_size(3), 3);
        assert_eq!(config.group_size(15), 3);
        assert_eq!(config.group_size(16), 0);
    }
}
