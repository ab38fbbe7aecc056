//! Placeholder substitution over documents made of paragraphs and (nested) tables.
//!
//! Text is replaced inside the formatted runs that hold it so the replacement keeps
//! the character formatting of the placeholder.

pub mod docx;

/// An ordered sequence of runs of formatted text.
pub trait Paragraph {
    fn run_count(&self) -> usize;
    fn run_text(&self, index: usize) -> String;
    fn set_run_text(&mut self, index: usize, text: &str);

    fn text(&self) -> String {
        (0..self.run_count()).map(|i| self.run_text(i)).collect()
    }
}

/// Anything holding paragraphs and tables: a document body or a table cell.
pub trait TextContainer {
    fn for_each_paragraph(&mut self, f: &mut dyn FnMut(&mut dyn Paragraph));
    /// Visits every cell of every table directly inside this container.
    fn for_each_cell(&mut self, f: &mut dyn FnMut(&mut dyn TextContainer));
}

/// Applies `replacements` in order. Placeholders missing from the document are ignored.
pub fn fill(container: &mut dyn TextContainer, replacements: &[(String, String)]) {
    for (placeholder, value) in replacements {
        replace_text(container, placeholder, value);
    }
}

/// Replaces `old` in every paragraph of `container`, then in every table cell, depth first.
pub fn replace_text(container: &mut dyn TextContainer, old: &str, new: &str) {
    if old.is_empty() {
        return;
    }
    container.for_each_paragraph(&mut |paragraph| replace_in_paragraph(paragraph, old, new));
    container.for_each_cell(&mut |cell| replace_text(cell, old, new));
}

fn replace_in_paragraph(paragraph: &mut dyn Paragraph, old: &str, new: &str) {
    let mut runs: Vec<String> = (0..paragraph.run_count())
        .map(|i| paragraph.run_text(i))
        .collect();
    if !runs.concat().contains(old) {
        return;
    }
    if let Some(first) = runs.iter().position(|run| run.contains(old)) {
        for (i, run) in runs.iter_mut().enumerate().skip(first) {
            if !run.contains(old) {
                continue;
            }
            *run = run.replace(old, if i == first { new } else { "" });
            paragraph.set_run_text(i, run);
        }
    }
    replace_across_runs(paragraph, runs, old, new);
}

/// Handles a placeholder split over several runs, as word processors do when part of
/// it was edited. The first run of each occurrence takes the replacement, the text of
/// the following runs up to the end of the placeholder is removed. Occurrences inside
/// a single run are left alone.
fn replace_across_runs(paragraph: &mut dyn Paragraph, mut runs: Vec<String>, old: &str, new: &str) {
    let mut changed = vec![false; runs.len()];
    let mut from = 0;
    loop {
        let joined = runs.concat();
        let start = match joined[from..].find(old) {
            Some(offset) => from + offset,
            None => break,
        };
        let end = start + old.len();

        let mut bounds = Vec::with_capacity(runs.len());
        let mut offset = 0;
        for run in &runs {
            bounds.push((offset, offset + run.len()));
            offset += run.len();
        }
        let (Some(first), Some(last)) = (
            bounds.iter().position(|&(s, e)| s <= start && start < e),
            bounds.iter().position(|&(s, e)| s < end && end <= e),
        ) else {
            break;
        };
        if first == last {
            from = end;
            continue;
        }

        let head = runs[first][..start - bounds[first].0].to_owned();
        let tail = runs[last][end - bounds[last].0..].to_owned();
        runs[first] = format!("{head}{new}");
        for run in &mut runs[first + 1..last] {
            run.clear();
        }
        runs[last] = tail;
        for flag in &mut changed[first..=last] {
            *flag = true;
        }
        from = start + new.len();
    }
    for (i, run) in runs.iter().enumerate() {
        if changed[i] {
            paragraph.set_run_text(i, run);
        }
    }
}
