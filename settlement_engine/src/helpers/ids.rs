use rand::{distributions::Alphanumeric, Rng};

/// Generates an opaque object id of the form `{prefix}_{12 alphanumeric chars}`, e.g. `wd_h1X9c0aBq2Lw`.
pub fn object_id(prefix: &str) -> String {
    let suffix: String = rand::thread_rng().sample_iter(&Alphanumeric).take(12).map(char::from).collect();
    format!("{prefix}_{suffix}")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ids_have_prefix_and_length() {
        let id = object_id("wd");
        assert!(id.starts_with("wd_"));
        assert_eq!(id.len(), 15);
    }

    #[test]
    fn ids_are_unique_enough() {
        let a = object_id("ord");
        let b = object_id("ord");
        assert_ne!(a, b);
    }
}
