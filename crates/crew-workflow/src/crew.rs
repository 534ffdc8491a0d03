//! Crew definition and execution

use crate::agent::AgentSpec;
use crate::events::{CrewEventHandler, NoOpCrewEventHandler, TaskToolEvents};
use crate::graph::TaskGraph;
use crate::policy::{ManagerPolicy, SchedulingPolicy, SchedulingState, SequentialPolicy};
use crate::task::{TaskOutput, TaskSpec};
use crate::template;
use crew_core::{Agent, Context, Error, Result, UsageMetrics};
use crew_runtime::{AgentRuntime, ExecutorAgent};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const PLANNER_ROLE: &str = "Task Execution Planner";
const CONTEXT_SEPARATOR: &str = "\n\n----------\n\n";

/// How ready tasks are ordered
#[derive(Debug, Clone)]
pub enum Process {
    /// Declaration order
    Sequential,
    /// A manager agent picks the next task
    Hierarchical {
        /// The coordinating agent, which must allow delegation
        manager: AgentSpec,
    },
}

/// Result of a crew run
#[derive(Debug, Clone, PartialEq)]
pub struct CrewOutput {
    /// Output of the final task
    pub raw: String,
    /// Outputs of every awaited task, in declaration order
    pub tasks_output: Vec<TaskOutput>,
    /// Usage of every awaited LLM call, planner and manager included
    pub token_usage: UsageMetrics,
}

impl CrewOutput {
    /// Output of the task called `name`
    pub fn task(&self, name: &str) -> Option<&TaskOutput> {
        self.tasks_output.iter().find(|t| t.name == name)
    }
}

/// A group of agents working through a task graph
///
/// # Example
///
/// ```no_run
/// use crew_workflow::{AgentSpec, Crew, Process, TaskSpec};
/// # use std::sync::Arc;
/// # async fn example(runtime: Arc<crew_runtime::AgentRuntime>) -> crew_core::Result<()> {
/// let crew = Crew::builder(runtime)
///     .agent(AgentSpec::new("Writer", "Write", "A writer."))
///     .task(TaskSpec::new("draft", "Write about {{ company_stock }}", "A draft", "Writer"))
///     .process(Process::Sequential)
///     .build()?;
///
/// let output = crew.kickoff([("company_stock", "IBM")]).await?;
/// println!("{}", output.raw);
/// # Ok(())
/// # }
/// ```
pub struct Crew {
    tasks: Vec<TaskSpec>,
    graph: TaskGraph,
    final_task: usize,
    agents: HashMap<String, (AgentSpec, Arc<ExecutorAgent>)>,
    policy: Arc<dyn SchedulingPolicy>,
    planner: Option<ExecutorAgent>,
    output_dir: PathBuf,
    events: Arc<dyn CrewEventHandler>,
}

impl Crew {
    /// Start building a crew on `runtime`
    pub fn builder(runtime: Arc<AgentRuntime>) -> CrewBuilder {
        CrewBuilder::new(runtime)
    }

    /// The task graph
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Task definitions, unrendered
    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    /// Run every task and return the final task's output
    ///
    /// Async tasks that nothing reads (and that are not the final task) are
    /// left running and excluded from the output.
    #[instrument(skip_all, fields(policy = self.policy.name()))]
    pub async fn kickoff<I, K, V>(&self, inputs: I) -> Result<CrewOutput>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let run_id = Uuid::new_v4().to_string();
        let mut context = Context::new(&run_id).with_inputs(inputs);
        info!(run_id = %run_id, tasks = self.tasks.len(), "Crew kickoff");

        let rendered = self.render_tasks(context.inputs())?;
        let plan = match &self.planner {
            Some(planner) => Some(self.plan(planner, &rendered, &mut context).await?),
            None => None,
        };

        let mut started = vec![false; rendered.len()];
        let mut outputs: Vec<Option<TaskOutput>> = vec![None; rendered.len()];
        let mut completed: Vec<TaskOutput> = Vec::new();
        let mut pending: BTreeMap<usize, JoinHandle<(Result<TaskOutput>, Context)>> =
            BTreeMap::new();

        loop {
            let ready = self.graph.ready(&started);
            if ready.is_empty() {
                break;
            }

            let state = SchedulingState {
                graph: &self.graph,
                tasks: &rendered,
                ready: &ready,
                completed: &completed,
            };
            let mut chosen = self.policy.next_task(&state, &mut context).await?;
            if !ready.contains(&chosen) {
                warn!(chosen, "Policy chose a task that is not ready, using first ready task");
                chosen = ready[0];
            }
            started[chosen] = true;

            for &dep in self.graph.dependencies(chosen) {
                if let Some(handle) = pending.remove(&dep) {
                    let output = join(&rendered[dep].name, handle, &mut context).await?;
                    self.finish(dep, output, &mut outputs, &mut completed).await?;
                }
            }

            let job = self.job(chosen, &rendered, &outputs, plan.as_deref())?;
            if rendered[chosen].async_execution {
                info!(task = %job.name, "Spawning async task");
                let mut fork = context.fork();
                pending.insert(
                    chosen,
                    tokio::spawn(async move {
                        let result = job.run(&mut fork).await;
                        (result, fork)
                    }),
                );
            } else {
                let output = job.run(&mut context).await?;
                self.finish(chosen, output, &mut outputs, &mut completed)
                    .await?;
            }
        }

        if let Some(handle) = pending.remove(&self.final_task) {
            let output = join(&rendered[self.final_task].name, handle, &mut context).await?;
            self.finish(self.final_task, output, &mut outputs, &mut completed)
                .await?;
        }

        for (i, _handle) in pending {
            info!(task = %rendered[i].name, "Detaching async task nothing depends on");
            self.events.on_task_detached(&rendered[i].name).await;
        }

        let raw = outputs[self.final_task]
            .as_ref()
            .map(|o| o.raw.clone())
            .ok_or_else(|| Error::Generic("final task produced no output".to_string()))?;
        let token_usage = context.usage();
        info!(
            total_tokens = token_usage.total_tokens(),
            requests = token_usage.successful_requests,
            "Crew finished"
        );

        Ok(CrewOutput {
            raw,
            tasks_output: outputs.into_iter().flatten().collect(),
            token_usage,
        })
    }

    fn render_tasks(&self, inputs: &BTreeMap<String, String>) -> Result<Vec<TaskSpec>> {
        self.tasks
            .iter()
            .map(|task| {
                Ok(TaskSpec {
                    description: template::render(&task.description, inputs)?,
                    expected_output: template::render(&task.expected_output, inputs)?,
                    ..task.clone()
                })
            })
            .collect()
    }

    async fn plan(
        &self,
        planner: &ExecutorAgent,
        tasks: &[TaskSpec],
        context: &mut Context,
    ) -> Result<String> {
        let mut prompt = String::from(
            "Create a concise step by step plan for the crew to complete the tasks below. \
             Cover each task in order and name the agent responsible.\n",
        );
        for task in tasks {
            let _ = write!(
                prompt,
                "\nTask: {}\nAgent: {}\nDescription: {}\nExpected output: {}\n",
                task.name, task.agent, task.description, task.expected_output
            );
        }

        let plan = planner.process(prompt, context).await?;
        info!(plan_length = plan.len(), "Planning complete");
        self.events.on_plan(&plan).await;
        Ok(plan)
    }

    fn job(
        &self,
        i: usize,
        tasks: &[TaskSpec],
        outputs: &[Option<TaskOutput>],
        plan: Option<&str>,
    ) -> Result<TaskJob> {
        let task = &tasks[i];
        let (spec, agent) = self
            .agents
            .get(&task.agent)
            .ok_or_else(|| Error::Configuration(format!("unknown agent '{}'", task.agent)))?;

        let context_outputs: Vec<&TaskOutput> = self
            .graph
            .dependencies(i)
            .iter()
            .filter_map(|&d| outputs[d].as_ref())
            .collect();

        Ok(TaskJob {
            name: task.name.clone(),
            agent_role: task.agent.clone(),
            description: task.description.clone(),
            prompt: task_prompt(task, &context_outputs, plan),
            agent: agent.clone(),
            time_limit: spec.max_execution_time,
            max_retries: spec.max_retry_limit,
            events: self.events.clone(),
        })
    }

    async fn finish(
        &self,
        i: usize,
        output: TaskOutput,
        outputs: &mut [Option<TaskOutput>],
        completed: &mut Vec<TaskOutput>,
    ) -> Result<()> {
        if let Some(file) = &self.tasks[i].output_file {
            let path = self.output_dir.join(file);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    Error::Generic(format!("cannot create {}: {e}", parent.display()))
                })?;
            }
            tokio::fs::write(&path, &output.raw)
                .await
                .map_err(|e| Error::Generic(format!("cannot write {}: {e}", path.display())))?;
            info!(task = %output.name, path = %path.display(), "Task output written");
        }

        self.events.on_task_complete(&output).await;
        completed.push(output.clone());
        outputs[i] = Some(output);
        Ok(())
    }
}

/// Everything needed to run one task, owned so it can be spawned
struct TaskJob {
    name: String,
    agent_role: String,
    description: String,
    prompt: String,
    agent: Arc<ExecutorAgent>,
    time_limit: Option<u64>,
    max_retries: usize,
    events: Arc<dyn CrewEventHandler>,
}

impl TaskJob {
    async fn run(self, context: &mut Context) -> Result<TaskOutput> {
        context.enter_task(&self.name);
        info!(task = %self.name, agent = %self.agent_role, "Task started");
        self.events.on_task_start(&self.name, &self.agent_role).await;

        let mut attempt = 1;
        let mut first_error: Option<Error> = None;
        loop {
            let error = match self.attempt(context).await {
                Ok(raw) => {
                    info!(task = %self.name, attempt, output_length = raw.len(), "Task completed");
                    return Ok(TaskOutput {
                        name: self.name,
                        agent: self.agent_role,
                        description: self.description,
                        raw,
                    });
                }
                Err(e) => e,
            };

            let retry = error.is_retryable() && attempt <= self.max_retries;
            warn!(task = %self.name, attempt, retry, error = %error, "Task attempt failed");
            if retry {
                self.events
                    .on_task_retry(&self.name, attempt, &error.to_string())
                    .await;
            }

            let first = first_error.take().unwrap_or(error);
            if !retry {
                return Err(first);
            }
            first_error = Some(first);
            attempt += 1;
        }
    }

    async fn attempt(&self, context: &mut Context) -> Result<String> {
        let events = TaskToolEvents::new(&self.name, self.events.clone());
        let run = self
            .agent
            .process_with_events(self.prompt.clone(), context, &events);

        match self.time_limit {
            Some(seconds) => tokio::time::timeout(Duration::from_secs(seconds), run)
                .await
                .map_err(|_| Error::Timeout {
                    task: self.name.clone(),
                    seconds,
                })?,
            None => run.await,
        }
    }
}

async fn join(
    name: &str,
    handle: JoinHandle<(Result<TaskOutput>, Context)>,
    context: &mut Context,
) -> Result<TaskOutput> {
    let (result, fork) = handle
        .await
        .map_err(|e| Error::ProcessingFailed(format!("async task '{name}' did not finish: {e}")))?;
    context.absorb(&fork);
    result
}

fn task_prompt(task: &TaskSpec, context_outputs: &[&TaskOutput], plan: Option<&str>) -> String {
    let mut prompt = task.description.clone();

    if let Some(plan) = plan {
        prompt.push_str("\n\nThe crew is following this plan:\n");
        prompt.push_str(plan);
    }

    let _ = write!(
        prompt,
        "\n\nThis is the expected criteria for your final answer: {}\n\
         You MUST return the actual complete content as the final answer, not a summary.",
        task.expected_output
    );

    if !context_outputs.is_empty() {
        let joined: Vec<&str> = context_outputs.iter().map(|o| o.raw.as_str()).collect();
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(&joined.join(CONTEXT_SEPARATOR));
    }

    prompt
}

/// Builder for [`Crew`]
pub struct CrewBuilder {
    runtime: Arc<AgentRuntime>,
    agents: Vec<AgentSpec>,
    tasks: Vec<TaskSpec>,
    process: Process,
    policy: Option<Arc<dyn SchedulingPolicy>>,
    planning: bool,
    output_dir: PathBuf,
    events: Arc<dyn CrewEventHandler>,
}

impl CrewBuilder {
    /// Create a builder with a sequential process and no planning
    pub fn new(runtime: Arc<AgentRuntime>) -> Self {
        Self {
            runtime,
            agents: Vec::new(),
            tasks: Vec::new(),
            process: Process::Sequential,
            policy: None,
            planning: false,
            output_dir: PathBuf::from("."),
            events: Arc::new(NoOpCrewEventHandler),
        }
    }

    /// Add an agent
    pub fn agent(mut self, agent: AgentSpec) -> Self {
        self.agents.push(agent);
        self
    }

    /// Add several agents
    pub fn agents(mut self, agents: impl IntoIterator<Item = AgentSpec>) -> Self {
        self.agents.extend(agents);
        self
    }

    /// Add a task
    pub fn task(mut self, task: TaskSpec) -> Self {
        self.tasks.push(task);
        self
    }

    /// Add several tasks
    pub fn tasks(mut self, tasks: impl IntoIterator<Item = TaskSpec>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    /// Set the process
    pub fn process(mut self, process: Process) -> Self {
        self.process = process;
        self
    }

    /// Use a custom scheduling policy instead of the one implied by the process
    pub fn policy(mut self, policy: Arc<dyn SchedulingPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Draft a plan before running and share it with every task
    pub fn planning(mut self, planning: bool) -> Self {
        self.planning = planning;
        self
    }

    /// Directory task output files are written under
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Receive run notifications
    pub fn event_handler(mut self, handler: Arc<dyn CrewEventHandler>) -> Self {
        self.events = handler;
        self
    }

    /// Validate the definition and create the agents
    pub fn build(self) -> Result<Crew> {
        if self.tasks.is_empty() {
            return Err(Error::InvalidGraph("a crew needs at least one task".to_string()));
        }

        let graph = TaskGraph::new(&self.tasks)?;

        if let Process::Hierarchical { manager } = &self.process {
            if !manager.allow_delegation {
                return Err(Error::Configuration(format!(
                    "manager '{}' must allow delegation",
                    manager.role
                )));
            }
        }

        let mut agents = HashMap::with_capacity(self.agents.len());
        for spec in self.agents {
            if agents.contains_key(&spec.role) {
                return Err(Error::Configuration(format!(
                    "duplicate agent role '{}'",
                    spec.role
                )));
            }
            let mut config = self.runtime.executor_config(spec.system_prompt());
            config.max_iterations = spec.max_iter;
            let agent = self
                .runtime
                .create_agent(config, spec.role.clone(), &spec.tools)?;
            agents.insert(spec.role.clone(), (spec, Arc::new(agent)));
        }

        for task in &self.tasks {
            if !agents.contains_key(&task.agent) {
                return Err(Error::InvalidGraph(format!(
                    "task '{}' is assigned to unknown agent '{}'",
                    task.name, task.agent
                )));
            }
        }

        let final_task = graph
            .topological_order()
            .last()
            .copied()
            .ok_or_else(|| Error::InvalidGraph("empty task graph".to_string()))?;

        let policy: Arc<dyn SchedulingPolicy> = match (self.policy, &self.process) {
            (Some(policy), _) => policy,
            (None, Process::Sequential) => Arc::new(SequentialPolicy),
            (None, Process::Hierarchical { manager }) => {
                let agent = coordinator(&self.runtime, manager)?;
                Arc::new(ManagerPolicy::new(Arc::new(agent)))
            }
        };

        let planner = if self.planning {
            Some(coordinator(
                &self.runtime,
                &AgentSpec::new(
                    PLANNER_ROLE,
                    "Plan how the crew completes its tasks.",
                    "An experienced planner who breaks work into clear steps.",
                ),
            )?)
        } else {
            None
        };

        Ok(Crew {
            tasks: self.tasks,
            graph,
            final_task,
            agents,
            policy,
            planner,
            output_dir: self.output_dir,
            events: self.events,
        })
    }
}

/// Tool-less agent that answers in a single completion
fn coordinator(runtime: &AgentRuntime, spec: &AgentSpec) -> Result<ExecutorAgent> {
    runtime.create_agent(
        runtime.executor_config(spec.system_prompt()),
        spec.role.clone(),
        &[] as &[&str],
    )
}
