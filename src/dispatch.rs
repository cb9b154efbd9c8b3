//! Running pipelines in the background.
//!
//! Every user action becomes one task on the tokio runtime. The task runs
//! fetch → render and sends the result to the UI thread over an [`mpsc`]
//! channel, which the main loop drains on every tick.
//!
//! ## For contributors
//!
//! There is deliberately no coordination between tasks: pressing a key twice
//! starts two requests, and whichever finishes last owns the results pane.
//! Nothing is cancelled and nothing times out.

use std::sync::mpsc;

use reqwest::Client;
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::error::ActionError;
use crate::fetch::{fetch, ResponseType};
use crate::pipeline::{Pipeline, ResultView};

/// Messages sent from background tasks to the UI thread.
#[derive(Debug)]
pub enum ActionMsg {
    /// The reachability probe succeeded; actions may be enabled.
    Ready,
    /// The reachability probe failed with this message.
    Unreachable(String),
    /// A pipeline rendered successfully.
    Finished { status: String, view: ResultView },
    /// A pipeline failed with this message.
    Failed(String),
}

/// Fetch and render one pipeline.
pub async fn run_pipeline(client: &Client, pipeline: &dyn Pipeline) -> Result<ResultView, ActionError> {
    let payload = fetch(client, pipeline.url(), pipeline.response_type()).await?;
    Ok(pipeline.render(&payload)?)
}

/// Spawns pipeline tasks and routes their results to one receiver.
#[derive(Clone)]
pub struct Dispatcher {
    handle: Handle,
    client: Client,
    tx: mpsc::Sender<ActionMsg>,
}

impl Dispatcher {
    /// Returns the dispatcher and the receiver the main loop should drain.
    pub fn new(handle: Handle, client: Client) -> (Self, mpsc::Receiver<ActionMsg>) {
        let (tx, rx) = mpsc::channel();
        (Self { handle, client, tx }, rx)
    }

    /// Probe `url`; only a successful response counts as reachable.
    pub fn check_reachability(&self, url: String) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        self.handle.spawn(async move {
            let msg = match fetch(&client, &url, ResponseType::Json).await {
                Ok(_) => {
                    info!(%url, "JIRA reachable");
                    ActionMsg::Ready
                }
                Err(e) => ActionMsg::Unreachable(e.to_string()),
            };
            // A closed channel means the UI has exited.
            let _ = tx.send(msg);
        });
    }

    pub fn run(&self, pipeline: Box<dyn Pipeline>) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        debug!(url = pipeline.url(), "dispatching");
        self.handle.spawn(async move {
            let msg = match run_pipeline(&client, pipeline.as_ref()).await {
                Ok(view) => ActionMsg::Finished {
                    status: pipeline.done_status(),
                    view,
                },
                Err(e) => ActionMsg::Failed(e.to_string()),
            };
            let _ = tx.send(msg);
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
