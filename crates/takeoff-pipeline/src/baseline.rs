//! The built-in detector: deterministic element synthesis driven by a
//! digest of the drawing bytes.
//!
//! Real deployments plug a model-backed [`Detector`] into the pipeline;
//! this one exists so the pipeline is exercisable end to end and so that
//! cache correctness can be tested against a detector whose output is a
//! pure function of its input.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

use takeoff_core::result::{
    Clash, ClashType, DetectedElement, DetectionOutput, IndustryDetection, Position,
};
use takeoff_core::{Industry, Severity};
use takeoff_convert::Analyzable;

use crate::detector::{Detector, DetectorConfig};
use crate::PipelineError;

const PIPE_MATERIALS: &[&str] = &["Copper", "PEX", "PVC"];
const PIPE_DIAMETERS: &[f64] = &[0.5, 0.75, 1.0, 1.5];

fn element_types(industry: Industry) -> &'static [&'static str] {
    match industry {
        Industry::Plumbing => &["pipe", "valve", "fixture"],
        Industry::Electrical => &["outlet", "junction_box", "panel"],
        Industry::Structural => &["beam", "column", "wall"],
        Industry::Mechanical => &["duct", "pump", "unit"],
        Industry::Hvac => &["vent", "diffuser", "return"],
    }
}

/// Deterministic detector seeded by a SHA-256 digest of the input bytes.
#[derive(Debug, Default)]
pub struct BaselineDetector;

struct Seed {
    digest: [u8; 32],
    cursor: usize,
}

impl Seed {
    fn new(bytes: &[u8]) -> Self {
        Self {
            digest: Sha256::digest(bytes).into(),
            cursor: 0,
        }
    }

    fn next(&mut self) -> u8 {
        let byte = self.digest[self.cursor % self.digest.len()];
        self.cursor += 1;
        byte
    }

    fn fraction(&mut self) -> f64 {
        f64::from(self.next()) / 255.0
    }
}

impl Detector for BaselineDetector {
    fn detect_elements(
        &self,
        input: &Analyzable,
        config: &DetectorConfig,
    ) -> Result<DetectionOutput, PipelineError> {
        if input.bytes.is_empty() {
            return Err(PipelineError::Detection(
                "normalized input is empty".to_string(),
            ));
        }

        let mut seed = Seed::new(&input.bytes);
        let mut industries = BTreeMap::new();

        for &industry in &config.industries {
            let count = 1 + usize::from(seed.next() % 4);
            let mut elements = Vec::with_capacity(count);
            let mut confidence_sum = 0.0;

            for n in 1..=count {
                let element = synthesize(&mut seed, industry, n, config.threshold);
                confidence_sum += element.confidence;
                elements.push(element);
            }

            industries.insert(
                industry,
                IndustryDetection {
                    element_count: count as u32,
                    confidence_score: confidence_sum / count as f64,
                    elements,
                },
            );
        }

        let clashes = synthesize_clashes(&mut seed, &industries);
        debug!(
            industries = industries.len(),
            clashes = clashes.len(),
            "baseline detection complete"
        );

        Ok(DetectionOutput {
            industries,
            clashes,
            threshold: config.threshold,
            mode: config.mode,
        })
    }
}

fn synthesize(seed: &mut Seed, industry: Industry, n: usize, threshold: f64) -> DetectedElement {
    let types = element_types(industry);
    let element_type = types[usize::from(seed.next()) % types.len()];
    // Confidence always clears the run threshold; sub-threshold detections
    // are what a model-backed detector would have dropped already.
    let confidence = (threshold + (1.0 - threshold) * seed.fraction()).min(0.99);
    let position = Position {
        x: seed.fraction() * 100.0,
        y: seed.fraction() * 100.0,
        z: 0.0,
    };

    let mut element = DetectedElement {
        id: format!("{industry}-{n}"),
        element_type: element_type.to_string(),
        position,
        confidence,
        diameter: None,
        material: None,
        voltage: None,
        circuit: None,
    };

    match industry {
        Industry::Plumbing if element_type == "pipe" => {
            element.diameter =
                Some(PIPE_DIAMETERS[usize::from(seed.next()) % PIPE_DIAMETERS.len()]);
            element.material =
                Some(PIPE_MATERIALS[usize::from(seed.next()) % PIPE_MATERIALS.len()].to_string());
        }
        Industry::Electrical => {
            element.voltage = Some(if seed.next() % 2 == 0 { 120 } else { 240 });
            element.circuit = Some(format!("C-{}", 1 + seed.next() % 12));
        }
        _ => {}
    }
    element
}

fn synthesize_clashes(
    seed: &mut Seed,
    industries: &BTreeMap<Industry, IndustryDetection>,
) -> Vec<Clash> {
    if industries.len() < 2 || seed.next() % 3 != 0 {
        return Vec::new();
    }

    let mut iter = industries.values();
    let (Some(first), Some(second)) = (iter.next(), iter.next()) else {
        return Vec::new();
    };
    let (Some(a), Some(b)) = (first.elements.first(), second.elements.first()) else {
        return Vec::new();
    };

    vec![Clash {
        id: "clash-1".to_string(),
        clash_type: if seed.next() % 2 == 0 {
            ClashType::HardClash
        } else {
            ClashType::ClearanceIssue
        },
        severity: if seed.next() % 2 == 0 {
            Severity::Major
        } else {
            Severity::Minor
        },
        elements: vec![a.id.clone(), b.id.clone()],
        position: a.position,
    }]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
