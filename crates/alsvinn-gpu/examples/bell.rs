//! Build a Bell pair and sample it.
//!
//! Run with `cargo run --example bell` (needs a GPU or software adapter).

use alsvinn_gpu::{BackendOptions, ContextOptions, Gate, GpuBackend, GpuSimResult};

fn main() -> GpuSimResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let h = std::f32::consts::FRAC_1_SQRT_2;
    let hadamard = Gate::from_reals(h, h, h, -h);
    let not = Gate::from_reals(0.0, 1.0, 1.0, 0.0);

    let options = BackendOptions::new()
        .with_context(ContextOptions::new().with_fallback_adapter(true));
    let mut backend = GpuBackend::with_options(2, options)?;
    println!(
        "running on {} ({})",
        backend.context().adapter_info().name,
        backend.context().backend_name()
    );

    backend.apply_gate(&hadamard, 0)?;
    backend.apply_controlled_gate(&not, 0, 1)?;

    let counts = backend.measure(1000)?;
    println!("bell pair over 1000 samples:");
    for label in ["00", "10", "01", "11"] {
        println!("  |{label}⟩  {:4}", counts.get(label));
    }

    backend.release()?;
    Ok(())
}
