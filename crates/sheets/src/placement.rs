/// Row number of the first free template row.
///
/// `cells` are the date-column values read downward from `first_data_row`;
/// a cell is free when it is blank or matches a placeholder (both compared
/// trimmed). Rows past the end of `cells` are blank. Returns `None` when
/// `cells` covers `window` rows and all of them are taken.
pub fn first_open_row(
    cells: &[String],
    first_data_row: u32,
    placeholders: &[String],
    window: u32,
) -> Option<u32> {
    let is_open = |cell: &String| {
        let v = cell.trim();
        v.is_empty() || placeholders.iter().any(|p| p.trim() == v)
    };
    let offset = match cells.iter().position(is_open) {
        Some(i) => i as u32,
        None if (cells.len() as u32) < window => cells.len() as u32,
        None => return None,
    };
    Some(first_data_row + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn placeholders() -> Vec<String> {
        cells(&["", "None", "-"])
    }

    #[test]
    fn empty_column_starts_at_first_row() {
        assert_eq!(first_open_row(&[], 19, &placeholders(), 100), Some(19));
    }

    #[test]
    fn skips_filled_rows() {
        let c = cells(&["03/01/2024", "03/02/2024"]);
        assert_eq!(first_open_row(&c, 19, &placeholders(), 100), Some(21));
    }

    #[test]
    fn placeholder_counts_as_free() {
        let c = cells(&["03/01/2024", " - ", "03/05/2024"]);
        assert_eq!(first_open_row(&c, 19, &placeholders(), 100), Some(20));
        let c = cells(&["03/01/2024", "None"]);
        assert_eq!(first_open_row(&c, 19, &placeholders(), 100), Some(20));
    }

    #[test]
    fn blank_is_free_without_placeholders() {
        let c = cells(&["x", "  "]);
        assert_eq!(first_open_row(&c, 1, &[], 100), Some(2));
    }

    #[test]
    fn full_window_has_no_free_row() {
        let c = cells(&["a", "b", "c"]);
        assert_eq!(first_open_row(&c, 19, &placeholders(), 3), None);
        assert_eq!(first_open_row(&c, 19, &placeholders(), 4), Some(22));
    }
}
