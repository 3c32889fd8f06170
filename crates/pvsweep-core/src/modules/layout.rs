//! On-disk addressing for jobs and reports.
//!
//! `Output/<dataset>/Temp<T>/<RxC>/<RxC>_<n>_<Suffix>.{cir,raw}` is the only
//! handoff between stages; report tiers live under `Output/Data/`.

use crate::common::constants::{
    COMBINED_REPORT, DATA_DIR, DISPATCH_REPORT, NETLIST_EXTENSION, RESULT_EXTENSION,
};
use crate::domain::{
    ArrayShape, JobKey, PvError, PvResult, parse_temperature_dir, temperature_dir_name,
};
use globset::{Glob, GlobMatcher};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_paths(&self, key: &JobKey) -> JobPaths {
        let stem = self.root.join(key.relative_stem());
        JobPaths {
            netlist: stem.with_extension(NETLIST_EXTENSION),
            result: stem.with_extension(RESULT_EXTENSION),
        }
    }

    pub fn shape_dir(&self, dataset: &str, temperature: i32, shape: ArrayShape) -> PathBuf {
        self.root
            .join(dataset)
            .join(temperature_dir_name(temperature))
            .join(shape.label())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn directory_report(&self, directory: &ShapeDirectory) -> PathBuf {
        self.data_dir()
            .join(&directory.dataset)
            .join(&directory.temperature_dir)
            .join(format!("{}.csv", directory.shape_dir))
    }

    pub fn dataset_report(&self, dataset: &str) -> PathBuf {
        self.data_dir()
            .join(dataset)
            .join(format!("{}.csv", dataset))
    }

    pub fn combined_report(&self) -> PathBuf {
        self.root.join(COMBINED_REPORT)
    }

    pub fn dispatch_report(&self) -> PathBuf {
        self.data_dir().join(DISPATCH_REPORT)
    }
}

/// Netlist and result locations for one job; their existence is the completion marker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct JobPaths {
    pub netlist: PathBuf,
    pub result: PathBuf,
}

impl JobPaths {
    pub fn for_netlist(netlist: &Path) -> Self {
        Self {
            netlist: netlist.to_path_buf(),
            result: netlist.with_extension(RESULT_EXTENSION),
        }
    }

    pub fn netlist_complete(&self) -> bool {
        self.netlist.is_file()
    }

    pub fn simulation_complete(&self) -> bool {
        self.result.is_file()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ShapeDirectory {
    pub dataset: String,
    pub temperature_dir: String,
    pub shape_dir: String,
    pub path: PathBuf,
}

impl ShapeDirectory {
    pub fn temperature(&self) -> Option<i32> {
        parse_temperature_dir(&self.temperature_dir)
    }
}

/// Walks `root/<dataset>/<temperature>/<shape>` for the requested datasets.
/// When `allowed_shapes` is given, other shape directories are ignored.
pub fn shape_directories<S: AsRef<str>>(
    root: &Path,
    datasets: &[S],
    allowed_shapes: Option<&[S]>,
) -> PvResult<Vec<ShapeDirectory>> {
    let mut directories = Vec::new();
    for dataset_path in sorted_subdirectories(root)? {
        let Some(dataset) = directory_name(&dataset_path) else {
            continue;
        };
        if !datasets.iter().any(|name| name.as_ref() == dataset) {
            continue;
        }

        for temperature_path in sorted_subdirectories(&dataset_path)? {
            let Some(temperature_dir) = directory_name(&temperature_path) else {
                continue;
            };
            for shape_path in sorted_subdirectories(&temperature_path)? {
                let Some(shape_dir) = directory_name(&shape_path) else {
                    continue;
                };
                if let Some(allowed) = allowed_shapes {
                    if !allowed.iter().any(|label| label.as_ref() == shape_dir) {
                        tracing::debug!(
                            "Ignoring {}/{}/{} - shape not selected",
                            dataset,
                            temperature_dir,
                            shape_dir
                        );
                        continue;
                    }
                }
                directories.push(ShapeDirectory {
                    dataset: dataset.clone(),
                    temperature_dir: temperature_dir.clone(),
                    shape_dir,
                    path: shape_path,
                });
            }
        }
    }
    Ok(directories)
}

pub fn extension_matcher(extension: &str) -> PvResult<GlobMatcher> {
    Glob::new(&format!("*.{}", extension))
        .map(|glob| glob.compile_matcher())
        .map_err(|source| {
            PvError::internal(
                "SYS.LAYOUT_GLOB",
                format!("failed to compile pattern for '.{}' files: {}", extension, source),
            )
        })
}

/// Regular files in `dir` whose name matches `matcher`, sorted by path.
pub fn files_matching(dir: &Path, matcher: &GlobMatcher) -> PvResult<Vec<PathBuf>> {
    let mut files = read_dir_paths(dir)?
        .into_iter()
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| matcher.is_match(Path::new(name)))
        })
        .collect::<Vec<_>>();
    files.sort();
    Ok(files)
}

fn sorted_subdirectories(dir: &Path) -> PvResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut directories = read_dir_paths(dir)?
        .into_iter()
        .filter(|path| path.is_dir())
        .collect::<Vec<_>>();
    directories.sort();
    Ok(directories)
}

fn read_dir_paths(dir: &Path) -> PvResult<Vec<PathBuf>> {
    let read_error = |source: std::io::Error| {
        PvError::io_system(
            "IO.LAYOUT_SCAN",
            format!("failed to scan directory '{}': {}", dir.display(), source),
        )
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        paths.push(entry.map_err(read_error)?.path());
    }
    Ok(paths)
}

fn directory_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

pub fn create_dir_all(path: &Path, placeholder: &'static str) -> PvResult<()> {
    fs::create_dir_all(path).map_err(|source| {
        PvError::io_system(
            placeholder,
            format!("failed to create directory '{}': {}", path.display(), source),
        )
    })
}
