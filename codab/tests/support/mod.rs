//! Shared fixtures for the integration tests.
//!
//! [`CellService`] stands in for the external geometry tool. A layer file
//! is JSON holding features whose geometry is a set of unit grid cells, so
//! union is set union, clipping is intersection and areas are cell counts.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use codab::config::{Iso3Filter, PipelineConfig};
use codab::geometry::{
    ClipSpec, GeometryError, GeometryService, Predicate, ScratchSpace, SelectColumn, TopologyStore,
};
use codab::model::{AdminLevel, Attributes, LayerKey};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

pub type Cell = (i32, i32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub attributes: Attributes,
    pub cells: BTreeSet<Cell>,
}

// =============================================================================
// Layer files
// =============================================================================

fn fake_error(reason: impl Into<String>) -> GeometryError {
    GeometryError::UnexpectedOutput {
        command: "cell-service".to_string(),
        reason: reason.into(),
    }
}

pub fn write_layer(path: &Path, features: &[Feature]) -> Result<(), GeometryError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string(features).map_err(|e| fake_error(e.to_string()))?;
    fs::write(path, text)?;
    Ok(())
}

pub fn read_layer(path: &Path) -> Result<Vec<Feature>, GeometryError> {
    if !path.exists() {
        return Err(GeometryError::MissingLayer(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| fake_error(format!("{}: {}", path.display(), e)))
}

/// Cells `x0..x1` by `y0..y1`.
pub fn rect(x0: i32, y0: i32, x1: i32, y1: i32) -> BTreeSet<Cell> {
    (x0..x1).flat_map(|x| (y0..y1).map(move |y| (x, y))).collect()
}

pub fn attributes(pairs: &[(&str, &str)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Some(v.to_string())))
        .collect()
}

/// A boundary feature of `iso3` at level `codes.len() - 1`.
///
/// `codes[i]` is the p-code of level `i`; names are derived from it.
pub fn admin_feature(iso3: &str, version: &str, codes: &[&str], cells: BTreeSet<Cell>) -> Feature {
    let mut attributes = attributes(&[
        ("iso3", iso3),
        ("iso2", &iso3[..2]),
        ("version", version),
        ("valid_on", "2024-01-01"),
    ]);
    for (level, code) in codes.iter().enumerate() {
        attributes.insert(format!("adm{}_pcode", level), Some(code.to_string()));
        attributes.insert(format!("adm{}_name", level), Some(format!("Name {}", code)));
    }
    Feature { attributes, cells }
}

/// Every cell covered by any feature.
pub fn union_of(features: &[Feature]) -> BTreeSet<Cell> {
    features.iter().flat_map(|f| f.cells.iter().copied()).collect()
}

fn dissolve_features(features: Vec<Feature>, group_by: &[String]) -> Vec<Feature> {
    let mut groups: BTreeMap<Vec<Option<String>>, BTreeSet<Cell>> = BTreeMap::new();
    for feature in features {
        let key: Vec<Option<String>> = group_by
            .iter()
            .map(|c| feature.attributes.get(c).cloned().flatten())
            .collect();
        groups.entry(key).or_default().extend(feature.cells);
    }
    groups
        .into_iter()
        .map(|(values, cells)| Feature {
            attributes: group_by.iter().cloned().zip(values).collect(),
            cells,
        })
        .collect()
}

fn chebyshev(a: Cell, b: Cell) -> i32 {
    (a.0 - b.0).abs().max((a.1 - b.1).abs())
}

// =============================================================================
// CellService
// =============================================================================

/// In-process geometry service over grid-cell layers.
pub struct CellService {
    reference_polygons: PathBuf,
    scratch: Mutex<HashMap<String, Vec<Feature>>>,
    discarded: Mutex<Vec<String>>,
}

impl CellService {
    pub fn new(reference_polygons: impl Into<PathBuf>) -> Self {
        Self {
            reference_polygons: reference_polygons.into(),
            scratch: Mutex::new(HashMap::new()),
            discarded: Mutex::new(Vec::new()),
        }
    }

    /// Scratch namespaces discarded so far, sorted.
    pub fn discarded(&self) -> Vec<String> {
        let mut names = self.discarded.lock().unwrap().clone();
        names.sort();
        names
    }

    /// Namespaces still holding scratch state.
    pub fn live_scratch(&self) -> usize {
        self.scratch.lock().unwrap().len()
    }

    fn extent(&self, reference: &Path, iso3: &str) -> Result<BTreeSet<Cell>, GeometryError> {
        let features = read_layer(reference)?;
        Ok(union_of(
            &features
                .into_iter()
                .filter(|f| f.attributes.get("iso3cd") == Some(&Some(iso3.to_string())))
                .collect::<Vec<_>>(),
        ))
    }

    fn with_scratch<R>(
        &self,
        scratch: &ScratchSpace,
        f: impl FnOnce(&mut Vec<Feature>) -> Result<R, GeometryError>,
    ) -> Result<R, GeometryError> {
        let mut state = self.scratch.lock().unwrap();
        let features = state
            .get_mut(&scratch.namespace)
            .ok_or_else(|| fake_error(format!("no scratch tables for {}", scratch.namespace)))?;
        f(features)
    }
}

impl GeometryService for CellService {
    fn read_attributes(&self, layer: &Path) -> Result<Vec<Attributes>, GeometryError> {
        Ok(read_layer(layer)?.into_iter().map(|f| f.attributes).collect())
    }

    fn filter(&self, input: &Path, output: &Path, predicate: &Predicate) -> Result<(), GeometryError> {
        let features: Vec<Feature> = read_layer(input)?
            .into_iter()
            .filter(|f| predicate.matches(&f.attributes))
            .collect();
        write_layer(output, &features)
    }

    fn select(&self, input: &Path, output: &Path, columns: &[SelectColumn]) -> Result<(), GeometryError> {
        let features: Vec<Feature> = read_layer(input)?
            .into_iter()
            .map(|f| {
                let attributes = columns
                    .iter()
                    .map(|column| match column {
                        SelectColumn::Column(name) => {
                            (name.clone(), f.attributes.get(name).cloned().flatten())
                        }
                        SelectColumn::Alias { from, to } => {
                            (to.clone(), f.attributes.get(from).cloned().flatten())
                        }
                        SelectColumn::Constant { value, alias } => {
                            (alias.clone(), Some(value.trim_matches('\'').to_string()))
                        }
                    })
                    .collect();
                Feature {
                    attributes,
                    cells: f.cells,
                }
            })
            .collect();
        write_layer(output, &features)
    }

    fn dissolve(&self, input: &Path, output: &Path, group_by: &[String]) -> Result<(), GeometryError> {
        write_layer(output, &dissolve_features(read_layer(input)?, group_by))
    }

    fn clip_dissolve(
        &self,
        input: &Path,
        output: &Path,
        clip: &ClipSpec,
        group_by: &[String],
    ) -> Result<(), GeometryError> {
        let extent = self.extent(&clip.reference, &clip.iso3)?;
        let clipped: Vec<Feature> = read_layer(input)?
            .into_iter()
            .map(|f| Feature {
                cells: f.cells.intersection(&extent).copied().collect(),
                attributes: f.attributes,
            })
            .filter(|f| !f.cells.is_empty())
            .collect();
        write_layer(output, &dissolve_features(clipped, group_by))
    }

    fn concat(&self, inputs: &[PathBuf], output: &Path, clean_coverage: bool) -> Result<(), GeometryError> {
        let mut features = Vec::new();
        let mut claimed = BTreeSet::new();
        for input in inputs {
            for mut feature in read_layer(input)? {
                if clean_coverage {
                    feature.cells.retain(|c| !claimed.contains(c));
                    claimed.extend(feature.cells.iter().copied());
                }
                features.push(feature);
            }
        }
        write_layer(output, &features)
    }

    fn bundle(&self, inputs: &[PathBuf], archive: &Path) -> Result<(), GeometryError> {
        if let Some(parent) = archive.parent() {
            fs::create_dir_all(parent)?;
        }
        let names: Vec<String> = inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        fs::write(archive, names.join("\n"))?;
        Ok(())
    }
}

impl TopologyStore for CellService {
    fn load(&self, scratch: &ScratchSpace, input: &Path) -> Result<(), GeometryError> {
        let features = read_layer(input)?;
        self.scratch
            .lock()
            .unwrap()
            .insert(scratch.namespace.clone(), features);
        Ok(())
    }

    fn derive_lines(&self, scratch: &ScratchSpace) -> Result<(), GeometryError> {
        self.with_scratch(scratch, |_| Ok(()))
    }

    /// Trims cells outside the country extent, hands every uncovered extent
    /// cell within `distance` to the nearest feature, and resolves overlaps
    /// in feature order. A zero distance leaves the layer untouched.
    fn snap(&self, scratch: &ScratchSpace, _reference_lines: &Path, distance: f64) -> Result<(), GeometryError> {
        let radius = distance.floor() as i32;
        if radius < 1 {
            return self.with_scratch(scratch, |_| Ok(()));
        }
        let extent = self.extent(&self.reference_polygons, &scratch.iso3)?;
        self.with_scratch(scratch, |features| {
            let mut claimed = BTreeSet::new();
            for feature in features.iter_mut() {
                feature
                    .cells
                    .retain(|c| extent.contains(c) && !claimed.contains(c));
                claimed.extend(feature.cells.iter().copied());
            }
            let original: Vec<BTreeSet<Cell>> = features.iter().map(|f| f.cells.clone()).collect();
            for cell in extent.difference(&claimed) {
                let nearest = original
                    .iter()
                    .enumerate()
                    .filter_map(|(i, cells)| {
                        cells.iter().map(|c| chebyshev(*c, *cell)).min().map(|d| (d, i))
                    })
                    .min();
                if let Some((d, i)) = nearest {
                    if d <= radius {
                        features[i].cells.insert(*cell);
                    }
                }
            }
            Ok(())
        })
    }

    fn merge_attributes(&self, scratch: &ScratchSpace) -> Result<(), GeometryError> {
        self.with_scratch(scratch, |_| Ok(()))
    }

    fn overlap_area(&self, scratch: &ScratchSpace) -> Result<f64, GeometryError> {
        self.with_scratch(scratch, |features| {
            let mut seen = BTreeSet::new();
            let mut overlapping = BTreeSet::new();
            for cell in features.iter().flat_map(|f| f.cells.iter()) {
                if !seen.insert(*cell) {
                    overlapping.insert(*cell);
                }
            }
            Ok(overlapping.len() as f64)
        })
    }

    fn gap_area(&self, scratch: &ScratchSpace, extent: &ClipSpec) -> Result<f64, GeometryError> {
        let extent = self.extent(&extent.reference, &extent.iso3)?;
        self.with_scratch(scratch, |features| {
            let covered = union_of(features);
            Ok(extent.difference(&covered).count() as f64)
        })
    }

    fn export(&self, scratch: &ScratchSpace, output: &Path, _layer_name: &str) -> Result<(), GeometryError> {
        self.with_scratch(scratch, |features| write_layer(output, features))
    }

    fn discard(&self, scratch: &ScratchSpace) -> Result<(), GeometryError> {
        self.scratch.lock().unwrap().remove(&scratch.namespace);
        self.discarded
            .lock()
            .unwrap()
            .push(scratch.namespace.clone());
        Ok(())
    }
}

// =============================================================================
// Data directory fixture
// =============================================================================

/// One metadata row of the source table.
pub struct MetadataRow<'a> {
    pub iso3: &'a str,
    pub version: &'a str,
    pub full: AdminLevel,
    pub max: AdminLevel,
    pub valid_on: &'a str,
    pub reviewed: &'a str,
}

impl<'a> MetadataRow<'a> {
    pub fn new(iso3: &'a str, version: &'a str, full: AdminLevel, max: AdminLevel) -> Self {
        Self {
            iso3,
            version,
            full,
            max,
            valid_on: "2024-01-01",
            reviewed: "2024-06-30",
        }
    }
}

/// Temporary data directory laid out the way the pipeline expects.
pub struct DataDir {
    pub dir: TempDir,
}

impl DataDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Config rooted here with a one-cell snap distance. CUB is excluded
    /// so the built-in supplementary record stays out of the fixtures.
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_data_dir(self.root())
            .with_iso3(Iso3Filter::new("", "CUB"))
            .with_threads(2)
            .with_distance(1.0)
    }

    pub fn service(&self) -> CellService {
        CellService::new(self.config().reference_polygons())
    }

    pub fn write_metadata(&self, rows: &[MetadataRow<'_>]) {
        let path = self.config().metadata_source();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut text = String::from(
            "country_name,country_iso3,version,admin_level_full,admin_level_max,date_valid_on,date_reviewed\n",
        );
        for row in rows {
            text.push_str(&format!(
                "Country {},{},{},{},{},{},{}\n",
                row.iso3, row.iso3, row.version, row.full, row.max, row.valid_on, row.reviewed
            ));
        }
        fs::write(path, text).unwrap();
    }

    /// Write one level of a country into `country/original`.
    pub fn write_original(&self, key: &LayerKey, level: AdminLevel, features: &[Feature]) -> PathBuf {
        let path = key.layer_path(&self.config().country_dir("original"), level);
        write_layer(&path, features).unwrap();
        path
    }

    /// Reference polygons, one feature per country.
    pub fn write_reference(&self, countries: &[(&str, BTreeSet<Cell>)]) {
        let features: Vec<Feature> = countries
            .iter()
            .map(|(iso3, cells)| Feature {
                attributes: attributes(&[("iso3cd", iso3)]),
                cells: cells.clone(),
            })
            .collect();
        write_layer(&self.config().reference_polygons(), &features).unwrap();
        write_layer(&self.config().reference_lines(), &[]).unwrap();
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }
}

/// Map of a layer's features by one attribute.
pub fn by_attribute(features: &[Feature], column: &str) -> BTreeMap<String, Feature> {
    features
        .iter()
        .filter_map(|f| {
            f.attributes
                .get(column)
                .cloned()
                .flatten()
                .map(|v| (v, f.clone()))
        })
        .collect()
}
