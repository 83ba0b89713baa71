use std::{
    collections::HashSet,
    io::{Cursor, Write},
};

use log::{debug, info, warn};
use zip::{
    write::{SimpleFileOptions, ZipWriter},
    CompressionMethod,
};

use crate::{
    datatypes::{AnalysisResult, StepResult, Subject},
    error::{AsperityError, StoreError},
    provenance::ProvenanceRenderer,
    runner::join_path,
    storage::ArtifactStore,
};

pub const ARCHIVE_FILENAME: &str = "contact_mechanics.zip";
pub const ARCHIVE_CONTENT_TYPE: &str = "application/x-zip-compressed";
pub const RESULT_SNAPSHOT: &str = "result.json";

const PLOT_HEADER: &str = ",Normalized pressure p/E*,Fractional contact area A/A0,\
                           Normalized mean gap u/h_rms,converged,filename\n";

const README: &str = r#"
Contents of this ZIP archive
============================
This archive contains results of contact mechanics calculations.

Each directory holds the results for one topography and is named after it.
Inside you find

- a CSV file 'plot.csv' with one line per calculation step,
- the snapshot 'result.json' of the complete analysis result,
- one field file 'result-step-<index>.json' per calculation step,
- a file 'info.txt' with version and parameter information.

The file 'plot.csv' has the following columns:

- Zero-based step index
- Normalized mean pressure in units of p/E*.
  The mean pressure is the total force divided by the nominal contact area A0.
- Fractional contact area in units of A/A0
- Mean gap between the surfaces
- True/False, whether the calculation converged within the iteration limit
- Name of the field file of this step

Each field file belongs to one applied pressure. It is a JSON document with
the arrays

* `contacting_points`: true where the point is in contact
* `pressure`: local pressure in units of E*
* `gap`: local gap
* `displacement`: local elastic displacement

stored column-major with the shape given in `nb_grid_pts`, and the scalars

* `mean_pressure`: mean pressure in units of E*
* `total_contact_area`: fractional contact area

Accessing the CSV file
======================

With numpy:

```
import numpy as np
pressure_contact_area = np.loadtxt("plot.csv", delimiter=",",
                                   skiprows=1, usecols=(1,2))
```

With pandas:

```
import pandas as pd
df = pd.read_csv("plot.csv", index_col=0)
```

Accessing the field files
=========================

Any JSON reader works. With numpy:

```
import json
import numpy as np
with open("result-step-0.json") as f:
    step = json.load(f)
pressure = np.reshape(step["pressure"], step["nb_grid_pts"], order="F")
```

Version information
===================

Software versions and parameters are listed in the 'info.txt' file of each
directory. They may differ between directories if the results were
calculated at different times.
"#;

/// One finished analysis to include in an archive
pub struct ExportItem<'a> {
    pub subject: &'a Subject,
    pub result: &'a AnalysisResult,
    /// Storage folder the result and its step artifacts live in
    pub folder: &'a str,
}

/// A finished zip archive, ready to be sent as an attachment
#[derive(Debug, Clone)]
pub struct Archive {
    pub filename: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Formats a float for plot.csv
///
/// Integral values lose their fractional part, very small and very large
/// magnitudes use a two-digit exponent (`1.5e-07`).
pub fn format_csv_float(value: f64) -> String {
    let magnitude = value.abs();
    if value == 0.0 || !value.is_finite() || (1e-4..1e16).contains(&magnitude) {
        return format!("{value}");
    }

    let formatted = format!("{value:e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => formatted,
    }
}

/// File name of a step artifact inside the archive
///
/// Directory components of the stored path are dropped; only its extension is kept.
pub fn step_filename(step: &StepResult) -> String {
    let basename = step.data_path.rsplit('/').next().unwrap_or_default();
    match basename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!("result-step-{}.{ext}", step.index)
        }
        _ => format!("result-step-{}", step.index),
    }
}

/// Builds the plot.csv table of a result, one row per step in step order
pub fn plot_csv(result: &AnalysisResult) -> String {
    let mut csv = String::from(PLOT_HEADER);
    for step in &result.steps {
        csv.push_str(&format!(
            "{index},{p},{a},{g},{converged},{filename}\n",
            index = step.index,
            p = format_csv_float(step.mean_pressure),
            a = format_csv_float(step.total_contact_area),
            g = format_csv_float(step.mean_gap),
            converged = if step.converged { "True" } else { "False" },
            filename = step_filename(step),
        ));
    }
    csv
}

/// Directory name per item: the subject name, suffixed with the subject id on collision
///
/// A suffixed name that is taken as well gets a running counter appended.
fn directory_names(items: &[ExportItem]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    items
        .iter()
        .map(|item| {
            let name = &item.subject.name;
            let mut dir = name.clone();
            if used.contains(&dir) {
                dir = format!("{name}-{}", item.subject.id);
                let mut n = 2;
                while used.contains(&dir) {
                    dir = format!("{name}-{}-{n}", item.subject.id);
                    n += 1;
                }
            }
            used.insert(dir.clone());
            dir
        })
        .collect()
}

struct ArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl ArchiveWriter {
    fn new() -> ArchiveWriter {
        ArchiveWriter {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    fn add(&mut self, name: &str, contents: &[u8]) -> Result<(), AsperityError> {
        self.zip.start_file(name, self.options)?;
        self.zip
            .write_all(contents)
            .map_err(|err| AsperityError::Archive(format!("Failed to write {name}: {err}")))
    }

    /// Copies a stored file into the archive, or records why it could not be copied
    fn copy(
        &mut self,
        store: &dyn ArtifactStore,
        source: &str,
        dir: &str,
        filename: &str,
    ) -> Result<(), AsperityError> {
        let target = format!("{dir}/{filename}");
        match store.read(source) {
            Ok(bytes) => self.add(&target, &bytes),
            Err(err) => self.add_failure(dir, filename, &target, &err),
        }
    }

    fn add_failure(
        &mut self,
        dir: &str,
        filename: &str,
        target: &str,
        err: &StoreError,
    ) -> Result<(), AsperityError> {
        warn!("cannot save file {target} in archive: {err}");
        self.add(
            &format!("{dir}/errors-{filename}.txt"),
            format!("Cannot save file {target} in ZIP, reason: {err}").as_bytes(),
        )
    }

    fn finish(self) -> Result<Vec<u8>, AsperityError> {
        Ok(self.zip.finish()?.into_inner())
    }
}

/// Builds one zip archive from finished analyses
///
/// Unreadable stored files do not abort the export: each is replaced by an
/// `errors-<file>.txt` entry next to where it would have been.
///
/// # Arguments
/// * `items` - Results to include, in archive order
/// * `store` - Storage holding the step artifacts and result snapshots
/// * `provenance` - Renders the info.txt of each result
pub fn export_zip(
    items: &[ExportItem],
    store: &dyn ArtifactStore,
    provenance: &dyn ProvenanceRenderer,
) -> Result<Archive, AsperityError> {
    let mut writer = ArchiveWriter::new();

    for (item, dir) in items.iter().zip(directory_names(items)) {
        debug!("adding '{}' as {dir}/", item.subject.name);

        writer.add(&format!("{dir}/plot.csv"), plot_csv(item.result).as_bytes())?;

        let snapshot = join_path(item.folder, RESULT_SNAPSHOT);
        match store.read(&snapshot) {
            Ok(bytes) => writer.add(&format!("{dir}/{RESULT_SNAPSHOT}"), &bytes)?,
            Err(StoreError::NotFound(_)) => debug!("no {RESULT_SNAPSHOT} in {}", item.folder),
            Err(err) => writer.add_failure(
                &dir,
                RESULT_SNAPSHOT,
                &format!("{dir}/{RESULT_SNAPSHOT}"),
                &err,
            )?,
        }

        for step in &item.result.steps {
            writer.copy(store, &step.data_path, &dir, &step_filename(step))?;
        }

        writer.add(
            &format!("{dir}/info.txt"),
            provenance.render(item.subject, item.result).as_bytes(),
        )?;
    }

    writer.add("README.txt", README.as_bytes())?;

    let bytes = writer.finish()?;
    info!(
        "exported {} result(s) into {} bytes",
        items.len(),
        bytes.len()
    );

    Ok(Archive {
        filename: ARCHIVE_FILENAME,
        content_type: ARCHIVE_CONTENT_TYPE,
        bytes,
    })
}
