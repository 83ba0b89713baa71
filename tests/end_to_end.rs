use std::io::{Cursor, Read};

use asperity::{
    export_zip, lookup,
    provenance::VersionHeader,
    run_analysis,
    runner::{NoProgress, StepArtifact},
    solver::ElasticFoundation,
    storage::{ArtifactStore, FsStore},
    topography::parse_csv,
    AnalysisResult, AsperityError, ContactParams, ExportItem, Subject,
};

/// Sinusoidal bumps on a 24x24 grid
fn bumpy_csv() -> String {
    (0..24)
        .map(|i| {
            (0..24)
                .map(|j| {
                    let (x, y) = (i as f64 / 24.0, j as f64 / 24.0);
                    let h = (std::f64::consts::TAU * x).sin() * (std::f64::consts::TAU * y).cos();
                    format!("{h:.6}")
                })
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn run_then_export_from_filesystem_store() -> Result<(), AsperityError> {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    let topo = parse_csv("bumps", &bumpy_csv(), Some((24.0, 24.0)), true)?;
    let params = ContactParams::from_json(r#"{"substrate": "periodic", "nsteps": 5}"#)?;

    let workflow = lookup("contact-mechanics").unwrap();
    let result = run_analysis(
        workflow,
        &topo,
        &params,
        &ElasticFoundation,
        &store,
        "bumps",
        &NoProgress,
    )?;

    assert_eq!(result.steps.len(), 5);
    assert!(result.alerts.is_empty());
    assert!(result.converged().iter().all(|c| *c));
    let areas = result.total_contact_areas();
    assert!(areas.windows(2).all(|w| w[0] <= w[1]));

    let stored = AnalysisResult::from_json(&store.read("bumps/result.json")?)?;
    assert_eq!(stored, result);

    let artifact: StepArtifact =
        serde_json::from_slice(&store.read(&result.steps[4].data_path)?).unwrap();
    assert_eq!(artifact.nb_grid_pts, (24, 24));
    assert_eq!(artifact.pressure.len(), 24 * 24);

    let subject = Subject {
        id: 1,
        name: "bumps".to_owned(),
    };
    let items = [ExportItem {
        subject: &subject,
        result: &stored,
        folder: "bumps",
    }];
    let archive = export_zip(&items, &store, &VersionHeader)?;

    let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
    let mut names: Vec<String> = zip.file_names().map(|n| n.to_owned()).collect();
    names.sort();
    assert_eq!(names.len(), 1 + 3 + 5);
    assert!(names.contains(&"bumps/result.json".to_owned()));
    assert!(names.contains(&"bumps/result-step-4.json".to_owned()));

    let mut plot = String::new();
    zip.by_name("bumps/plot.csv").unwrap().read_to_string(&mut plot).unwrap();
    let rows: Vec<&str> = plot.lines().skip(1).collect();
    assert_eq!(rows.len(), 5);
    assert!(rows[0].starts_with("0,"));
    assert!(rows[4].ends_with(",True,result-step-4.json"));

    Ok(())
}

#[test]
fn periodicity_mismatch_is_reported_but_not_fatal() -> Result<(), AsperityError> {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    let topo = parse_csv("bumps", &bumpy_csv(), None, true)?;
    let params = ContactParams::from_json(r#"{"substrate": "nonperiodic", "pressures": [0.01]}"#)?;

    let workflow = lookup("contact-mechanics").unwrap();
    let result = run_analysis(
        workflow,
        &topo,
        &params,
        &ElasticFoundation,
        &store,
        "bumps",
        &NoProgress,
    )?;

    assert_eq!(result.alerts.len(), 1);
    assert_eq!(result.steps.len(), 1);
    Ok(())
}
