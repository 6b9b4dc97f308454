use std::path::Path;

use chrono::Duration;

/// Converts a duration into fractional seconds, which is how categories accumulate time.
pub fn duration_seconds(duration: Duration) -> f64 {
    match duration.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.,
        // Only reachable for spans of hundreds of thousands of years
        None => duration.num_seconds() as f64,
    }
}

/// Project name shown in reports. Same as the document file name without its extension.
pub fn project_name(document_path: &Path) -> String {
    document_path
        .file_stem()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::Duration;

    use super::{duration_seconds, project_name};

    #[test]
    fn test_duration_seconds_keeps_fractions() {
        assert_eq!(duration_seconds(Duration::milliseconds(1500)), 1.5);
        assert_eq!(duration_seconds(Duration::seconds(-2)), -2.);
    }

    #[test]
    fn test_project_name_from_path() {
        assert_eq!(project_name(Path::new("/work/scenes/forest.blend")), "forest");
        assert_eq!(project_name(Path::new("forest")), "forest");
        assert_eq!(project_name(Path::new("")), "");
    }
}
