use csc_protocol::{LinkError, SensorEvent};
use futures::stream::StreamExt;
use futures::Future;
use futures_channel::mpsc;

/// Actor trait for implementing message-driven components
///
/// Actors are independent, stateful components that communicate through
/// message passing. Each actor has its own message queue and processes
/// messages sequentially.
///
/// # Lifecycle
///
/// 1. **init()** - Called once before message processing starts
/// 2. **handle()** - Called for each received message
/// 3. **shutdown()** - Called when the actor is stopping
///
/// # Example
///
/// ```ignore
/// struct MyActor {
///     state: u32,
///     event_tx: mpsc::Sender<SensorEvent>,
/// }
///
/// impl Actor for MyActor {
///     type Message = MyMessage;
///
///     fn name(&self) -> &'static str {
///         "MyActor"
///     }
///
///     async fn handle(&mut self, msg: Self::Message) -> Result<(), LinkError> {
///         // Process message
///         Ok(())
///     }
/// }
/// ```
#[allow(async_fn_in_trait)]
pub trait Actor: Send + 'static {
    /// Message type this actor processes
    type Message: Send + 'static;

    /// Actor name (used for logging and debugging)
    fn name(&self) -> &'static str;

    /// Initialize the actor before processing messages
    ///
    /// Called once when the actor starts. Use this to set up resources,
    /// restore state, or perform initial configuration.
    fn init(&mut self) -> impl Future<Output = Result<(), LinkError>> + Send {
        async { Ok(()) }
    }

    /// Handle a single message
    ///
    /// This is called for each message received by the actor.
    /// Messages are processed sequentially in the order received.
    fn handle(
        &mut self,
        msg: Self::Message,
    ) -> impl Future<Output = Result<(), LinkError>> + Send;

    /// Clean up before shutdown
    ///
    /// Called when the actor is stopping. Use this to release transport
    /// resources or flush pending state.
    fn shutdown(&mut self) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Main actor run loop (provided by runtime)
    ///
    /// This method consumes the actor and runs it to completion.
    /// It handles initialization, message processing, and shutdown.
    /// Handler errors are reported on `event_tx` and never stop the loop.
    ///
    /// # Arguments
    ///
    /// * `rx` - Channel to receive messages from
    /// * `event_tx` - Channel to send events to the UI layer
    fn run(
        mut self,
        mut rx: mpsc::Receiver<Self::Message>,
        event_tx: mpsc::Sender<SensorEvent>,
    ) -> impl Future<Output = ()> + Send
    where
        Self: Sized,
    {
        async move {
        // Initialize
        if let Err(e) = self.init().await {
            let _ = event_tx.clone().try_send(SensorEvent::Error {
                message: format!("{} init failed: {}", self.name(), e),
            });
            return;
        }

        #[cfg(debug_assertions)]
        eprintln!("{} started", self.name());

        // Process messages
        while let Some(msg) = rx.next().await {
            if let Err(e) = self.handle(msg).await {
                let _ = event_tx.clone().try_send(SensorEvent::Error {
                    message: format!("{} error: {}", self.name(), e),
                });
            }
        }

        // Shutdown
        self.shutdown().await;

        #[cfg(debug_assertions)]
        eprintln!("{} stopped", self.name());
        }
    }
}

/// Spawn an actor onto the tokio runtime
///
/// The actor runs until its message channel closes, then shuts down.
pub fn spawn_actor<A>(actor: A, rx: mpsc::Receiver<A::Message>, event_tx: mpsc::Sender<SensorEvent>)
where
    A: Actor,
{
    tokio::spawn(actor.run(rx, event_tx));
}
