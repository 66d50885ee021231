//! Header and header-comment assembly from raw header lines.

/// Merge header lines into one header
///
/// No lines give an empty header and a single line is returned verbatim.
/// With several lines, blanks in the first line inherit the nearest
/// non-empty value to their left (spanning cells), then each column joins
/// the cells of every line with a space and is stripped. Shorter lines are
/// padded with blanks to the widest line.
pub fn assemble_header(lines: &[Vec<String>]) -> Vec<String> {
    match lines {
        [] => Vec::new(),
        [only] => only.clone(),
        [first, rest @ ..] => {
            let mut first = first.clone();
            forward_fill(&mut first);

            let width = lines.iter().map(Vec::len).max().unwrap_or(0);
            (0..width)
                .map(|col| {
                    std::iter::once(&first)
                        .chain(rest.iter())
                        .map(|line| line.get(col).map(String::as_str).unwrap_or(""))
                        .collect::<Vec<_>>()
                        .join(" ")
                        .trim()
                        .to_string()
                })
                .collect()
        }
    }
}

/// Join header comment lines column by column with a space
pub fn assemble_comment(lines: &[Vec<String>]) -> Vec<String> {
    let width = lines.iter().map(Vec::len).max().unwrap_or(0);

    (0..width)
        .map(|col| {
            lines
                .iter()
                .map(|line| line.get(col).map(String::as_str).unwrap_or(""))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Fill blank cells from the nearest non-empty cell to the left
fn forward_fill(line: &mut [String]) {
    let mut last: Option<String> = None;

    for cell in line.iter_mut() {
        if cell.trim().is_empty() {
            if let Some(value) = &last {
                cell.clone_from(value);
            }
        } else {
            last = Some(cell.clone());
        }
    }
}
