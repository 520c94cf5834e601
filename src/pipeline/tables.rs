//! Markdown table repair for previews.
//!
//! Models often emit pipe tables without the `|---|` separator row, which
//! markdown renderers then show as plain text. Only the preview path uses
//! this; downloaded files keep the model's text as sanitised.

/// A line is a table row when it holds more than two pipes.
fn is_row(line: &str) -> bool {
    line.matches('|').count() > 2
}

/// Insert a missing separator after the header row of every table run.
pub fn fix_tables(markdown: &str) -> String {
    let lines: Vec<&str> = markdown.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 4);
    let mut in_table = false;

    for (i, line) in lines.iter().enumerate() {
        if !is_row(line) {
            in_table = false;
            out.push(line.to_string());
            continue;
        }

        out.push(line.trim().to_string());
        if in_table {
            continue;
        }
        in_table = true;

        let next_has_separator = match lines.get(i + 1) {
            Some(next) => next.contains("---"),
            None => true,
        };
        if !next_has_separator {
            let columns = line.matches('|').count().saturating_sub(1).max(1);
            out.push(format!("|{}|", vec!["---"; columns].join("|")));
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_missing_separator() {
        let md = "| a | b |\n| 1 | 2 |";
        assert_eq!(fix_tables(md), "| a | b |\n|---|---|\n| 1 | 2 |");
    }

    #[test]
    fn keeps_existing_separator() {
        let md = "| a | b |\n|---|---|\n| 1 | 2 |";
        assert_eq!(fix_tables(md), md);
    }

    #[test]
    fn rows_are_trimmed() {
        let md = "  | a | b |  \n  | 1 | 2 |";
        assert_eq!(fix_tables(md), "| a | b |\n|---|---|\n| 1 | 2 |");
    }

    #[test]
    fn two_pipes_is_not_a_row() {
        let md = "a | b | c\ntext";
        assert_eq!(fix_tables(md), md);
    }

    #[test]
    fn separate_runs_each_get_a_separator() {
        let md = "| a | b |\n| 1 | 2 |\n\n| c | d |\n| 3 | 4 |";
        let fixed = fix_tables(md);
        assert_eq!(fixed.matches("|---|---|").count(), 2);
    }

    #[test]
    fn header_as_last_line_gets_nothing() {
        assert_eq!(fix_tables("intro\n| a | b |"), "intro\n| a | b |");
    }

    #[test]
    fn non_table_lines_are_verbatim() {
        let md = "# Title  \nplain   ";
        assert_eq!(fix_tables(md), md);
    }
}
