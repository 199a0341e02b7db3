//! Core storage for Taskdeck session task lists.

pub mod config;
pub mod lock;
pub mod migrate;
pub mod store;
pub mod task;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::version;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
