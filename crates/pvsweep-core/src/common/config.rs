//! `data_sets.ini` loading.
//!
//! Every section other than `[DEFAULT]` names a `<full>-<shade>` dataset and may
//! carry a `temps` key in the list/range grammar understood by
//! [`expand_temperatures`]. Keys in `[DEFAULT]` act as fallbacks for every
//! section, the way INI readers usually treat that section.

use crate::domain::{Dataset, PvError, PvResult};
use crate::modules::geometry::expand_temperatures;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const DEFAULT_SECTION: &str = "DEFAULT";
const TEMPS_KEY: &str = "temps";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatasetConfig {
    pub datasets: Vec<Dataset>,
}

impl DatasetConfig {
    pub fn names(&self) -> Vec<String> {
        self.datasets
            .iter()
            .map(|dataset| dataset.name.clone())
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|dataset| dataset.name == name)
    }
}

#[derive(Debug, Clone, Default)]
struct IniSection {
    name: String,
    entries: BTreeMap<String, String>,
    source_line: usize,
}

pub fn load_dataset_config(path: &Path) -> PvResult<DatasetConfig> {
    let source = fs::read_to_string(path).map_err(|source| {
        PvError::io_system(
            "IO.CONFIG_READ",
            format!(
                "failed to read dataset configuration '{}': {}",
                path.display(),
                source
            ),
        )
    })?;
    parse_dataset_config(&source)
}

pub fn parse_dataset_config(source: &str) -> PvResult<DatasetConfig> {
    let sections = parse_ini_sections(source)?;
    let defaults = sections
        .iter()
        .find(|section| section.name == DEFAULT_SECTION)
        .map(|section| section.entries.clone())
        .unwrap_or_default();

    let mut datasets = Vec::new();
    for section in sections
        .iter()
        .filter(|section| section.name != DEFAULT_SECTION)
    {
        let (full, shade) = Dataset::parse_name(&section.name).map_err(|error| {
            PvError::input_validation(
                error.placeholder(),
                format!("{} (section at line {})", error.message(), section.source_line),
            )
        })?;
        let temps = section
            .entries
            .get(TEMPS_KEY)
            .or_else(|| defaults.get(TEMPS_KEY))
            .map(String::as_str)
            .unwrap_or("");

        datasets.push(Dataset {
            name: section.name.clone(),
            full,
            shade,
            temperatures: expand_temperatures(temps)?,
        });
    }

    Ok(DatasetConfig { datasets })
}

fn parse_ini_sections(source: &str) -> PvResult<Vec<IniSection>> {
    let mut sections: Vec<IniSection> = Vec::new();

    for (index, raw_line) in source.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let name = header.strip_suffix(']').ok_or_else(|| {
                PvError::input_validation(
                    "INPUT.CONFIG_SECTION",
                    format!("unterminated section header '{}' at line {}", line, line_number),
                )
            })?;
            let name = name.trim();
            if sections.iter().any(|section| section.name == name) {
                return Err(PvError::input_validation(
                    "INPUT.CONFIG_SECTION",
                    format!("duplicate section '{}' at line {}", name, line_number),
                ));
            }
            sections.push(IniSection {
                name: name.to_string(),
                entries: BTreeMap::new(),
                source_line: line_number,
            });
            continue;
        }

        let Some(section) = sections.last_mut() else {
            return Err(PvError::input_validation(
                "INPUT.CONFIG_ENTRY",
                format!("entry '{}' at line {} appears before any section", line, line_number),
            ));
        };

        let (key, value) = line.split_once(['=', ':']).ok_or_else(|| {
            PvError::input_validation(
                "INPUT.CONFIG_ENTRY",
                format!("expected 'key = value' at line {}, found '{}'", line_number, line),
            )
        })?;
        section
            .entries
            .insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::{load_dataset_config, parse_dataset_config};
    use crate::common::constants::DEFAULT_TEMPERATURES;
    use crate::domain::PvErrorCategory;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn sections_become_datasets_in_file_order() {
        let config = parse_dataset_config(
            "; study configuration\n[1000-900]\ntemps = 27, 30-32\n\n[1000-500]\nTEMPS: 40\n",
        )
        .expect("config should parse");

        assert_eq!(config.names(), vec!["1000-900", "1000-500"]);
        let first = config.find("1000-900").expect("first dataset");
        assert_eq!((first.full, first.shade), (1000, 900));
        assert_eq!(first.temperatures, vec![27, 30, 31, 32]);
        assert_eq!(config.find("1000-500").expect("second").temperatures, vec![40]);
    }

    #[test]
    fn default_section_is_skipped_but_supplies_fallbacks() {
        let config = parse_dataset_config("[DEFAULT]\ntemps = 45\n[800-400]\n[900-450]\ntemps =\n")
            .expect("config should parse");

        assert_eq!(config.names(), vec!["800-400", "900-450"]);
        assert_eq!(config.datasets[0].temperatures, vec![45]);
        assert_eq!(config.datasets[1].temperatures, DEFAULT_TEMPERATURES.to_vec());
    }

    #[test]
    fn missing_temps_fall_back_to_builtin_list() {
        let config = parse_dataset_config("[1000-900]\n").expect("config should parse");
        assert_eq!(config.datasets[0].temperatures, DEFAULT_TEMPERATURES.to_vec());
    }

    #[test]
    fn malformed_section_names_are_rejected() {
        let error = parse_dataset_config("[sunny]\ntemps = 30\n").expect_err("bad section");
        assert_eq!(error.category(), PvErrorCategory::InputValidationError);
        assert_eq!(error.placeholder(), "INPUT.DATASET_NAME");
        assert!(error.message().contains("line 1"));
    }

    #[test]
    fn malformed_temperature_tokens_surface_as_input_errors() {
        let error = parse_dataset_config("[1000-900]\ntemps = 27, hot\n").expect_err("bad token");
        assert_eq!(error.placeholder(), "INPUT.TEMPERATURE_TOKEN");
    }

    #[test]
    fn entries_before_sections_are_rejected() {
        let error = parse_dataset_config("temps = 30\n[1000-900]\n").expect_err("orphan entry");
        assert_eq!(error.placeholder(), "INPUT.CONFIG_ENTRY");
    }

    #[test]
    fn load_reports_missing_files_as_io_errors() {
        let temp = TempDir::new().expect("tempdir should be created");
        let missing = temp.path().join("data_sets.ini");
        let error = load_dataset_config(&missing).expect_err("missing config");
        assert_eq!(error.category(), PvErrorCategory::IoSystemError);

        fs::write(&missing, "[1000-900]\ntemps = 30\n").expect("config should be written");
        let config = load_dataset_config(&missing).expect("config should load");
        assert_eq!(config.datasets[0].temperatures, vec![30]);
    }
}
