use crate::datatypes::{AnalysisResult, Subject};

/// Renders the `info.txt` provenance header of an exported result
pub trait ProvenanceRenderer {
    fn render(&self, subject: &Subject, result: &AnalysisResult) -> String;
}

/// Names the software, its version and the parameters behind a result
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionHeader;

impl ProvenanceRenderer for VersionHeader {
    fn render(&self, subject: &Subject, result: &AnalysisResult) -> String {
        let kwargs = &result.effective_kwargs;
        let hardness = match kwargs.hardness {
            Some(h) => h.to_string(),
            None => "none".to_owned(),
        };
        let pressures = kwargs
            .pressures
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let mut header = String::new();
        header.push_str(&format!("{}\n", result.name));
        header.push_str(&"=".repeat(result.name.len()));
        header.push('\n');
        header.push_str(&format!("Subject: {} (id {})\n", subject.name, subject.id));
        header.push_str(&format!(
            "Software: {} {}\n",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ));
        header.push_str("\nParameters\n----------\n");
        header.push_str(&format!("substrate: {}\n", kwargs.substrate_str.as_str()));
        header.push_str(&format!("hardness: {hardness}\n"));
        header.push_str(&format!("pressures: {pressures}\n"));
        header.push_str(&format!("maxiter: {}\n", result.maxiter));
        header.push_str(&format!("min_pentol: {}\n", result.min_pentol));
        header.push_str(&format!("area per grid point: {}\n", result.area_per_pt));

        if !result.alerts.is_empty() {
            header.push_str("\nAlerts\n------\n");
            for alert in &result.alerts {
                header.push_str(&format!("{:?}: {}\n", alert.severity, alert.message));
            }
        }

        header
    }
}
