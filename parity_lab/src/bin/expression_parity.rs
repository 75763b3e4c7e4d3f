use std::{collections::BTreeMap, env};

use anyhow::{bail, Context, Result};
use calc_core::{config::EvaluatorSettings, parity, Operator};
use parity_lab::{
    cases::{build_case_sets, CaseSet},
    EvaluationStatus, Evaluator,
};
use tracer::init_tracing;

struct CliOptions {
    count: usize,
    seed: u64,
    tolerance: f32,
    skip_dispatch: bool,
}

#[derive(Default)]
struct OperatorResiduals {
    cases: usize,
    max_residual: f32,
    diverged: usize,
    lane_mismatches: usize,
}

fn main() -> Result<()> {
    init_tracing();
    let options = parse_options()?;

    println!(
        "Generating expression cases (random count={}, seed=0x{:X})",
        options.count, options.seed
    );
    let case_sets = build_case_sets(options.count, options.seed);

    if options.skip_dispatch {
        for set in &case_sets {
            println!("Prepared set '{}' ({} cases)", set.label, set.cases.len());
        }
        println!("Skip-dispatch flag set; exiting after case preparation.");
        return Ok(());
    }

    let settings = EvaluatorSettings {
        parity_tolerance: options.tolerance,
        ..Default::default()
    };
    let evaluator = pollster::block_on(Evaluator::start(settings));
    if let Some(name) = pollster::block_on(evaluator.accelerator().adapter_name()) {
        println!("Accelerator adapter: {name}");
    }

    let mut failed_sets = Vec::new();
    for set in &case_sets {
        println!("Running set '{}' ({} cases)", set.label, set.cases.len());
        if !run_set(&evaluator, set, options.tolerance)? {
            failed_sets.push(set.label.clone());
        }
    }
    pollster::block_on(evaluator.shutdown());

    if !failed_sets.is_empty() {
        bail!(
            "accelerator results diverged beyond tolerance in: {}",
            failed_sets.join(", ")
        );
    }
    Ok(())
}

fn parse_options() -> Result<CliOptions> {
    let mut opts = CliOptions {
        count: 128,
        seed: 0xA11CE,
        tolerance: EvaluatorSettings::default().parity_tolerance,
        skip_dispatch: false,
    };

    for arg in env::args().skip(1) {
        if let Some(value) = arg.strip_prefix("--count=") {
            opts.count = value.parse().context("invalid --count value")?;
        } else if let Some(value) = arg.strip_prefix("--seed=") {
            opts.seed = parse_seed(value).context("invalid --seed value")?;
        } else if let Some(value) = arg.strip_prefix("--tolerance=") {
            opts.tolerance = value.parse().context("invalid --tolerance value")?;
        } else if arg == "--skip-dispatch" {
            opts.skip_dispatch = true;
        } else {
            bail!("unrecognized argument: {arg}");
        }
    }

    Ok(opts)
}

/// Returns `false` when any case diverged or the accelerator was unavailable.
fn run_set(evaluator: &Evaluator, set: &CaseSet, tolerance: f32) -> Result<bool> {
    let mut per_operator: BTreeMap<&'static str, OperatorResiduals> = BTreeMap::new();
    let mut degraded = 0usize;

    for text in &set.cases {
        let result = evaluator
            .evaluate_expression_blocking(text)
            .with_context(|| format!("generated case {text} failed to parse"))?;
        let entry = per_operator
            .entry(result.expression.operator().symbol())
            .or_default();
        entry.cases += 1;

        match &result.status {
            EvaluationStatus::AcceleratorFailed(err) => {
                degraded += 1;
                if degraded == 1 {
                    println!("  accelerator failed: {err}");
                }
            }
            EvaluationStatus::Verified {
                accelerator_value,
                diagnostics,
            }
            | EvaluationStatus::Diverged {
                accelerator_value,
                diagnostics,
            } => {
                entry.max_residual = entry
                    .max_residual
                    .max(parity::residual(result.reference_value, *accelerator_value));
                if matches!(result.status, EvaluationStatus::Diverged { .. }) {
                    entry.diverged += 1;
                    println!(
                        "  diverged: {} reference={} accelerator={}",
                        result.expression, result.reference_value, accelerator_value
                    );
                }
                let mismatches =
                    parity::diagnostic_mismatches(&result.expression, diagnostics, tolerance);
                if !mismatches.is_empty() {
                    entry.lane_mismatches += 1;
                    println!(
                        "  diagnostic slots {mismatches:?} differ for {}",
                        result.expression
                    );
                }
            }
        }
    }

    println!("Set '{}' residuals (tolerance={tolerance}):", set.label);
    for op in Operator::ALL {
        if let Some(stats) = per_operator.get(op.symbol()) {
            println!(
                "  [{}] cases={:<4} max |residual|={:.3e} diverged={} lane mismatches={}",
                op.symbol(),
                stats.cases,
                stats.max_residual,
                stats.diverged,
                stats.lane_mismatches
            );
        }
    }
    if degraded > 0 {
        println!("  {degraded} case(s) fell back to the host reference");
    }

    let clean = degraded == 0
        && per_operator
            .values()
            .all(|stats| stats.diverged == 0 && stats.lane_mismatches == 0);
    Ok(clean)
}

fn parse_seed(value: &str) -> Result<u64> {
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).context("expected hex literal")
    } else {
        value.parse().context("expected integer seed")
    }
}

mod tracer {
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt().try_init();
    }
}
