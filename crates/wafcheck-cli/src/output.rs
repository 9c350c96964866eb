use wafcheck_domain::ProvisioningRequest;
use wafcheck_harness::CycleReport;

/// Render a request as plain text, variables before environment.
pub fn render_request(request: &ProvisioningRequest) -> String {
    let mut out = String::new();
    out.push_str(&format!("suffix   {}\n", request.suffix));
    out.push_str(&format!("region   {}\n", request.region));
    out.push_str(&format!("dir      {}\n", request.terraform_dir.display()));
    out.push_str("vars:\n");
    for (name, value) in request.vars() {
        out.push_str(&format!("  {} = {}\n", name, value.render()));
    }
    out.push_str("env:\n");
    for (key, value) in &request.env {
        out.push_str(&format!("  {}={}\n", key, value));
    }
    out
}

pub fn render_report(report: &CycleReport) -> String {
    let mut out = render_request(&report.request);
    out.push_str("steps:\n");
    for run in &report.runs {
        let secs = (run.finished_at - run.started_at).num_milliseconds() as f64 / 1000.0;
        out.push_str(&format!("  {:<18} exit {} ({:.1}s)\n", run.step.to_string(), run.exit_code, secs));
    }
    if !report.outputs.is_empty() {
        out.push_str("outputs:\n");
        for (name, value) in &report.outputs {
            out.push_str(&format!("  {} = {}\n", name, value));
        }
    }
    out.push_str(if report.destroyed {
        "destroyed: yes\n"
    } else {
        "destroyed: no\n"
    });
    out
}
