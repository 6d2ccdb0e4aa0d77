// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment of the job process.

use rn_core::{JobSpec, ResolvedUser, RunContext};
use rn_env::Env;

/// `PATH` for jobs when the agent has none.
pub const DEFAULT_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Build the job environment.
///
/// Order: login variables, then run and cluster placement (`RN_*`, empty
/// values omitted), then the job's declared env expanded against what came
/// before. Nothing else is inherited from the agent.
pub fn job_env(
    spec: &JobSpec,
    context: &RunContext,
    user: &ResolvedUser,
    agent_path: Option<String>,
) -> Env {
    let mut env = Env::new();
    let name = user.display_name();
    env.set("HOME", user.home_dir.to_string_lossy());
    env.set("USER", name.clone());
    env.set("LOGNAME", name);
    env.set("SHELL", "/bin/sh");
    env.set("PATH", agent_path.filter(|p| !p.is_empty()).unwrap_or_else(|| DEFAULT_PATH.to_string()));

    let cluster = &context.cluster_info;
    let run_vars = [
        ("RN_RUN_ID", context.run.run_id.to_string()),
        ("RN_RUN_NAME", context.run.run_name.clone()),
        ("RN_JOB_ID", spec.job_id.to_string()),
        ("RN_JOB_NAME", spec.job_name.clone()),
        ("RN_REPO_HASH", context.run.repo.hash.clone().unwrap_or_default()),
        ("RN_NODES_NUM", cluster.nodes_num.to_string()),
        ("RN_NODE_RANK", cluster.node_rank.to_string()),
        ("RN_GPUS_PER_JOB", cluster.gpus_per_job.to_string()),
        ("RN_MASTER_ADDR", cluster.master_addr.clone().unwrap_or_default()),
    ];
    env.update(run_vars.into_iter().filter(|(_, v)| !v.is_empty()), false);

    env.update(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())), true);
    env
}

#[cfg(test)]
#[path = "vars_tests.rs"]
mod tests;
