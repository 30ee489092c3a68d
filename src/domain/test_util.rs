use anyhow::anyhow;

/// Whether an in-memory driven port fake should behave like a healthy backing store
/// or like one that can't be reached.
pub enum Connectivity {
    Connected,
    Disconnected,
}

impl Connectivity {
    /// Fails with a port error when the fake is "disconnected"
    pub fn blow_up_if_disconnected(&self) -> Result<(), anyhow::Error> {
        match self {
            Self::Connected => Ok(()),
            Self::Disconnected => Err(anyhow!("could not reach the backing store!")),
        }
    }
}

/// Records the arguments of every call to a faked async trait method and hands back a
/// preconfigured return value. Meant to live inside a `Mutex` so mock trait implementations
/// can mutate it through `&self`:
///
/// ```ignore
/// impl TaskPort for Mutex<MockTaskService> {
///     async fn get_task(&self, user_id: Uuid, task_id: Uuid, ...) -> Result<Task, TaskError> {
///         let mut locked_self = self.lock().unwrap();
///         locked_self.get_task_result.save_arguments((user_id, task_id));
///         locked_self.get_task_result.return_value_result()
///     }
/// }
/// ```
pub struct FakeImplementation<Args, Ret> {
    saved_arguments: Vec<Args>,
    return_value: Option<Ret>,
}

impl<Args, Ret> FakeImplementation<Args, Ret> {
    pub fn new() -> FakeImplementation<Args, Ret> {
        FakeImplementation {
            saved_arguments: Vec::new(),
            return_value: None,
        }
    }

    /// Captures the arguments of one invocation
    pub fn save_arguments(&mut self, arguments: Args) {
        self.saved_arguments.push(arguments)
    }

    /// Every set of arguments this fake was invoked with, in call order
    pub fn calls(&self) -> &[Args] {
        self.saved_arguments.as_slice()
    }
}

impl<Args, Success, Fail> FakeImplementation<Args, Result<Success, Fail>>
where
    Success: Clone,
    Fail: Clone,
{
    pub fn set_returned_result(&mut self, return_value: Result<Success, Fail>) {
        self.return_value = Some(return_value);
    }

    pub fn return_value_result(&self) -> Result<Success, Fail> {
        match self.return_value {
            Some(ref result) => result.clone(),
            None => panic!("Tried to return from a function where the return value wasn't set!"),
        }
    }
}
