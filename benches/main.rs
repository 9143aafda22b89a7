use std::time::Duration;

use criterion::Criterion;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod mpc;
mod primitives;

fn main() {
    // RUST_LOG=polyshare=debug prints the duration of every protocol span
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_span_events(FmtSpan::CLOSE)
        .init();

    let mut c = Criterion::default()
        .significance_level(0.1)
        .sample_size(10)
        .warm_up_time(Duration::from_secs(1))
        .configure_from_args();

    primitives::primitives_benchmark(&mut c);
    mpc::mpc_benchmarks(&mut c);

    c.final_summary();
}
