use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use tracing::{info, warn};

use super::{banner, Action, ActionContext};
use crate::error::ActionError;

/// Writes an hprof dump to a path built from a strftime template.
#[derive(Debug, Clone)]
pub struct HeapDump {
    template: PathBuf,
}

impl HeapDump {
    pub fn new(template: PathBuf) -> Self {
        Self { template }
    }

    /// Expands the template for `when` and makes it absolute.
    pub fn resolve_path<Tz>(&self, when: &DateTime<Tz>) -> io::Result<PathBuf>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let template = self.template.to_string_lossy();
        let mut expanded = String::new();
        write!(expanded, "{}", when.format(&template)).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid heap dump path template `{}`", template),
            )
        })?;

        let path = PathBuf::from(expanded);
        if path.is_absolute() {
            Ok(path)
        } else {
            Ok(std::env::current_dir()?.join(path))
        }
    }
}

impl Action for HeapDump {
    fn name(&self) -> &'static str {
        "heap dump"
    }

    fn act(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        if ctx.flags.is_threads() {
            warn!("cannot create heap dump since the JVM is unable to create a thread");
            return Ok(());
        }

        let path = self.resolve_path(&Local::now())?;
        create_parent(&path)?;

        banner(ctx.out, "Heap Dump")?;
        ctx.out.flush()?;

        info!(path = %path.display(), "dumping heap");
        ctx.dumper.dump_heap(&path)?;

        writeln!(ctx.out, "Heap dump written to {}", path.display())?;
        ctx.out.flush()?;
        Ok(())
    }
}

fn create_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
