//! Small utilities shared across the engine: commission arithmetic, id generation, and the transfer
//! description convention that links provider callbacks back to withdrawal requests.
mod commission;
mod ids;

pub use commission::{seller_share, CommissionRate};
pub use ids::object_id;

/// Transfer descriptions sent to the payout provider carry the originating withdrawal id behind this
/// prefix, so that asynchronous transfer-status callbacks can be routed back to the right request.
pub const WITHDRAWAL_DESCRIPTION_PREFIX: &str = "Lumen payout - ";

/// Recovers a withdrawal id from a payout transfer description. Returns `None` for descriptions that do
/// not carry our prefix (i.e. transfers that did not originate from this system).
pub fn withdrawal_id_from_description(description: &str) -> Option<&str> {
    let rest = description.trim().strip_prefix(WITHDRAWAL_DESCRIPTION_PREFIX)?;
    let id = rest.trim();
    (!id.is_empty()).then_some(id)
}

/// Builds the transfer description for a withdrawal id. The inverse of [`withdrawal_id_from_description`].
pub fn withdrawal_description(withdrawal_id: &str) -> String {
    format!("{WITHDRAWAL_DESCRIPTION_PREFIX}{withdrawal_id}")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn description_round_trip() {
        let desc = withdrawal_description("wd_1a2b3c");
        assert_eq!(desc, "Lumen payout - wd_1a2b3c");
        assert_eq!(withdrawal_id_from_description(&desc), Some("wd_1a2b3c"));
    }

    #[test]
    fn foreign_descriptions_are_ignored() {
        assert_eq!(withdrawal_id_from_description("Rent for March"), None);
        assert_eq!(withdrawal_id_from_description("Lumen payout - "), None);
        assert_eq!(withdrawal_id_from_description(""), None);
    }

    #[test]
    fn whitespace_is_tolerated() {
        assert_eq!(withdrawal_id_from_description("  Lumen payout - wd_9  "), Some("wd_9"));
    }
}
