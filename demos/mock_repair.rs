//! Example: one correction pass against canned replies, no network needed.
//!
//! Needs `python3` on `PATH` (Unix only).
//!
//! Run with: `cargo run --example mock_repair`

use solution_craft::{
    Component, Consultant, CorrectionLoop, Executor, ExecutorConfig, MockBackend, Provider,
    Solution,
};

#[cfg(unix)]
fn link_python(folder: &std::path::Path) -> std::io::Result<bool> {
    let python = ["/usr/bin/python3", "/usr/local/bin/python3", "/bin/python3"]
        .into_iter()
        .find(|p| std::path::Path::new(p).exists());
    let Some(python) = python else {
        return Ok(false);
    };
    let bin = folder.join("venv").join("bin");
    std::fs::create_dir_all(&bin)?;
    std::os::unix::fs::symlink(python, bin.join("python"))?;
    Ok(true)
}

#[cfg(not(unix))]
fn link_python(_folder: &std::path::Path) -> std::io::Result<bool> {
    Ok(false)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let folder = std::env::temp_dir().join(format!("solution-craft-demo-{}", std::process::id()));
    std::fs::create_dir_all(&folder)?;
    if !link_python(&folder)? {
        println!("python3 not found, nothing to demo");
        return Ok(());
    }

    let mut solution = Solution::new("calc", &folder)
        .with_description("Print 2 + 2")
        .with_component(Component::from_file_name("helper.py", "def add(a,b): return a+b+\n"))?
        .with_component(Component::from_file_name(
            "main.py",
            "from helper import add\nprint(add(2,2))\n",
        ))?;
    solution.persist_components()?;

    // helper.py is consulted first, main.py second.
    let mock = MockBackend::new(vec![
        "The trailing `+` is a syntax error.\n```python\ndef add(a,b): return a+b\n```".into(),
        "NO".into(),
    ]);
    let repair = CorrectionLoop::new(
        Consultant::single(Provider::mock("mock", mock)),
        Executor::new(ExecutorConfig::default()),
    )
    .with_max_iterations(2);

    let outcome = repair.run(&mut solution).await?;
    println!("{:?} after {} passes", outcome.status, outcome.iterations);
    for pass in &outcome.passes {
        for (file, result) in &pass.outcomes {
            println!("  pass {} {}: {:?}", pass.iteration, file, result);
        }
    }
    println!("{}", solution.result_description);

    std::fs::remove_dir_all(&folder)?;
    Ok(())
}
