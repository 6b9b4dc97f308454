use super::categories::CategoryStore;

/// Name of the text buffer reports are printed into.
pub const REPORT_BUFFER: &str = "TimeMe";

const BANNER_WIDTH: usize = 50;

/// Fixed layout report of every category, in display order.
pub fn render_report(project_name: &str, categories: &CategoryStore) -> String {
    let banner = "=".repeat(BANNER_WIDTH);
    let mut lines = vec![
        banner.clone(),
        "= Counting this project time by TimeMe =".to_string(),
        banner.clone(),
        format!("PROJECT: {project_name}"),
    ];
    lines.extend(
        categories
            .iter()
            .map(|category| format!("{}: {}", category.name(), category.display())),
    );
    lines.push(banner);
    lines.join("\n")
}
