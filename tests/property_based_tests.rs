//! Property tests for the DeLTA preset and error mapping.

use proptest::prelude::*;
use std::path::Path;

use toolrun::delta::{DeltaCli, KEY_MIN_CELL_AREA};

proptest! {
    /// The translated `-C` token is the only place the area appears, and the
    /// token count does not depend on its value.
    #[test]
    fn prop_min_cell_area_is_one_token(area in any::<i64>()) {
        let mut cli = DeltaCli::new();
        let handle = cli.min_cell_area();
        cli.invocation_mut().set(handle, area).unwrap();
        cli.set_paths(Path::new("/data")).unwrap();

        let tokens = cli.invocation().build().unwrap();
        prop_assert_eq!(tokens.len(), 10);
        prop_assert_eq!(&tokens[2], &format!("min_cell_area={area}"));
        prop_assert!(!tokens.iter().any(|t| t == "-C"));
    }

    /// Settings exported from one preset restore the same value into a fresh one.
    #[test]
    fn prop_settings_restore_min_cell_area(area in any::<i64>()) {
        let mut source = DeltaCli::new();
        let handle = source.min_cell_area();
        source.invocation_mut().set(handle, area).unwrap();
        let settings = source.invocation().settings();
        prop_assert_eq!(settings.len(), 1);
        prop_assert!(settings.contains_key(KEY_MIN_CELL_AREA));

        let mut target = DeltaCli::new();
        let restored = target.invocation_mut().apply_settings(&settings).unwrap();
        prop_assert_eq!(restored, 1);
        prop_assert_eq!(target.invocation().get(target.min_cell_area()), Some(area));
    }

    /// Paths without whitespace survive into `--input` and `--output` unchanged.
    #[test]
    fn prop_paths_follow_directory(dir in "/[a-z0-9_]{1,12}(/[a-z0-9_]{1,12}){0,3}") {
        let mut cli = DeltaCli::new();
        cli.set_paths(Path::new(&dir)).unwrap();

        let tokens = cli.invocation().build().unwrap();
        prop_assert_eq!(&tokens[7], &format!("{dir}/img-t{{t}}.tif"));
        prop_assert_eq!(&tokens[9], &format!("{dir}/results"));
    }
}
