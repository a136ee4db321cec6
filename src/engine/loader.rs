use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::dsl;
use crate::error::{SourceLoadError, UnitError};

use super::runtime::Runtime;

/// One script: identity plus raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub name: String,
    pub text: String,
}

impl SourceUnit {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Yields source units one at a time, in load order.
pub trait ScriptSourceProvider {
    fn next_unit(&mut self) -> Option<Result<SourceUnit, SourceLoadError>>;
}

/// In-memory units, yielded in insertion order.
#[derive(Debug, Default)]
pub struct MemorySource {
    units: VecDeque<SourceUnit>,
}

impl MemorySource {
    pub fn new(units: impl IntoIterator<Item = SourceUnit>) -> Self {
        Self {
            units: units.into_iter().collect(),
        }
    }
}

impl ScriptSourceProvider for MemorySource {
    fn next_unit(&mut self) -> Option<Result<SourceUnit, SourceLoadError>> {
        self.units.pop_front().map(Ok)
    }
}

/// Files on disk. Directories expand to their script files sorted by name;
/// explicit files are taken in the order given.
#[derive(Debug)]
pub struct DirectorySource {
    pending: VecDeque<Result<PathBuf, SourceLoadError>>,
}

impl DirectorySource {
    pub fn new(paths: &[PathBuf], extension: &str) -> Self {
        let mut pending = VecDeque::new();
        for path in paths {
            if path.is_dir() {
                match script_files(path, extension) {
                    Ok(files) => pending.extend(files.into_iter().map(Ok)),
                    Err(e) => pending.push_back(Err(SourceLoadError {
                        unit: path.display().to_string(),
                        message: e.to_string(),
                    })),
                }
            } else {
                pending.push_back(Ok(path.clone()));
            }
        }
        Self { pending }
    }
}

fn script_files(dir: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

impl ScriptSourceProvider for DirectorySource {
    fn next_unit(&mut self) -> Option<Result<SourceUnit, SourceLoadError>> {
        let path = match self.pending.pop_front()? {
            Ok(path) => path,
            Err(e) => return Some(Err(e)),
        };
        let name = path.display().to_string();
        Some(
            std::fs::read_to_string(&path)
                .map(|text| SourceUnit { name: name.clone(), text })
                .map_err(|e| SourceLoadError {
                    unit: name,
                    message: e.to_string(),
                }),
        )
    }
}

/// Outcome of loading every unit a provider yields.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<UnitError>,
}

impl LoadReport {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Translate and install one unit. Nothing is registered unless the whole
/// unit translates.
pub fn load_unit(rt: &Runtime, unit: &SourceUnit) -> Result<(), UnitError> {
    let program = dsl::translate(&unit.name, &unit.text).map_err(|e| UnitError::from_dsl(&unit.name, &unit.text, e))?;
    let entities = program.entities.len();
    let has_main = program.main.is_some();
    rt.install(program);
    info!(unit = %unit.name, entities, has_main, "unit loaded");
    Ok(())
}

/// Load units strictly in order. A failing unit is logged and skipped.
pub fn load_all(rt: &Runtime, provider: &mut dyn ScriptSourceProvider) -> LoadReport {
    let mut report = LoadReport::default();
    while let Some(next) = provider.next_unit() {
        let result = next
            .map_err(UnitError::from)
            .and_then(|unit| load_unit(rt, &unit).map(|()| unit.name));
        match result {
            Ok(name) => report.loaded.push(name),
            Err(e) => {
                error!(unit = %e.unit(), error = %e, "unit failed to load");
                report.failed.push(e);
            }
        }
    }
    report
}
