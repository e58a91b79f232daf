use std::collections::HashMap;
use std::fmt;

const MIN_NAME_WIDTH: usize = "Class Name".len();

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClassStats {
    pub count: u64,
    pub total_size: i64,
}

/// Per-class instance counts and byte totals for one heap walk.
#[derive(Debug, Default)]
pub struct ObjectHistogram {
    classes: HashMap<String, ClassStats>,
}

impl ObjectHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_object(&mut self, class_signature: &str, size: i64) {
        match self.classes.get_mut(class_signature) {
            Some(stats) => {
                stats.count += 1;
                stats.total_size += size;
            }
            None => {
                self.classes.insert(
                    class_signature.to_string(),
                    ClassStats { count: 1, total_size: size },
                );
            }
        }
    }

    pub fn get(&self, class_signature: &str) -> Option<ClassStats> {
        self.classes.get(class_signature).copied()
    }

    /// Number of distinct classes recorded.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn render(&self, max_entries: usize) -> HistogramReport {
        self.render_with(max_entries, |sig| sig.to_string())
    }

    /// Sorts by total size, largest first, keeps the first `max_entries`
    /// (0 keeps everything) and maps each signature to a display name.
    pub fn render_with<F>(&self, max_entries: usize, display_name: F) -> HistogramReport
    where
        F: Fn(&str) -> String,
    {
        let mut entries: Vec<(&String, &ClassStats)> = self.classes.iter().collect();
        // signature breaks ties so equal sizes render in a stable order
        entries.sort_by(|(sig1, s1), (sig2, s2)| {
            s2.total_size.cmp(&s1.total_size).then_with(|| sig1.cmp(sig2))
        });

        if max_entries > 0 {
            entries.truncate(max_entries);
        }

        let rows: Vec<HistogramRow> = entries
            .into_iter()
            .map(|(sig, stats)| HistogramRow {
                count: stats.count,
                total_size: stats.total_size,
                class_name: display_name(sig),
            })
            .collect();

        let name_width = rows
            .iter()
            .map(|r| r.class_name.chars().count())
            .fold(MIN_NAME_WIDTH, usize::max);

        HistogramReport { rows, name_width }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramRow {
    pub count: u64,
    pub total_size: i64,
    pub class_name: String,
}

/// A rendered histogram. `Display` writes the fixed-column table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramReport {
    rows: Vec<HistogramRow>,
    name_width: usize,
}

impl HistogramReport {
    pub fn rows(&self) -> &[HistogramRow] {
        &self.rows
    }

    pub fn name_width(&self) -> usize {
        self.name_width
    }
}

impl fmt::Display for HistogramReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "| Instance Count | Total Bytes | {:<width$} |",
            "Class Name",
            width = self.name_width
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "| {:<14} | {:<11} | {:<width$} |",
                row.count,
                row.total_size,
                row.class_name,
                width = self.name_width
            )?;
        }
        Ok(())
    }
}
