pub const FULL: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "+git.",
    env!("TASKDECK_GIT_COUNT"),
    ".",
    env!("TASKDECK_GIT_SHA"),
    env!("TASKDECK_GIT_DIRTY")
);

#[cfg(test)]
mod tests {
    use super::FULL;

    #[test]
    fn version_includes_package_version() {
        assert!(FULL.starts_with(env!("CARGO_PKG_VERSION")));
        assert!(FULL.contains("+git."));
    }
}
