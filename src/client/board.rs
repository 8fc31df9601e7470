use super::{ClientError, ClientResult, SessionStore, TaskApiClient};
use crate::models::task::{NewTask, Task, TaskPatch};
use crate::models::user::{AuthResponse, LoginRequest, PublicUser, RegisterRequest};
use std::fmt::Write;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Tasks,
}

/// The create/edit form. `editing` holds the id of the task being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub editing: Option<String>,
    pub title: String,
    pub description: String,
}

impl TaskForm {
    pub fn create() -> Self {
        TaskForm::default()
    }

    pub fn edit(task: &Task) -> Self {
        TaskForm {
            editing: Some(task.id.clone()),
            title: task.title.clone(),
            description: task.description.clone(),
        }
    }

    pub fn is_edit(&self) -> bool {
        self.editing.is_some()
    }
}

/// Client-side state of the task screen.
///
/// The task list is always refetched from the server after a mutation.
pub struct TaskBoard<S: SessionStore> {
    api: TaskApiClient,
    store: S,
    token: Option<String>,
    user: Option<PublicUser>,
    tasks: Vec<Task>,
    form: Option<TaskForm>,
    view: View,
}

impl<S: SessionStore> TaskBoard<S> {
    pub fn new(api: TaskApiClient, store: S) -> Self {
        TaskBoard {
            api,
            store,
            token: None,
            user: None,
            tasks: Vec::new(),
            form: None,
            view: View::Login,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn user(&self) -> Option<&PublicUser> {
        self.user.as_ref()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn form(&self) -> Option<&TaskForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut TaskForm> {
        self.form.as_mut()
    }

    fn token(&self) -> ClientResult<String> {
        self.token.clone().ok_or(ClientError::NotLoggedIn)
    }

    /// Resumes a stored session. Returns `false` when there is none or it was rejected.
    pub async fn restore(&mut self) -> ClientResult<bool> {
        let Some(token) = self.store.load()? else {
            return Ok(false);
        };

        match self.api.me(&token).await {
            Ok(user) => {
                self.token = Some(token);
                self.user = Some(user);
                self.view = View::Tasks;
                self.refresh().await?;
                Ok(true)
            }
            Err(e) if e.is_unauthorized() => {
                info!("Stored session rejected, clearing it");
                self.store.clear()?;
                Ok(false)
            }
            Err(e) => Err(logged("restore session", e)),
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) -> ClientResult<()> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth = self
            .api
            .login(&request)
            .await
            .map_err(|e| logged("login", e))?;
        self.start_session(auth).await
    }

    pub async fn register(&mut self, username: &str, email: &str, password: &str) -> ClientResult<()> {
        let request = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth = self
            .api
            .register(&request)
            .await
            .map_err(|e| logged("register", e))?;
        self.start_session(auth).await
    }

    async fn start_session(&mut self, auth: AuthResponse) -> ClientResult<()> {
        self.store.save(&auth.token)?;
        self.token = Some(auth.token);
        self.user = Some(auth.user);
        self.view = View::Tasks;
        self.refresh().await
    }

    pub async fn refresh(&mut self) -> ClientResult<()> {
        let token = self.token()?;
        self.tasks = self
            .api
            .list_tasks(&token)
            .await
            .map_err(|e| logged("load tasks", e))?;
        Ok(())
    }

    /// Opens the form empty for a new task, or prefilled to edit `task`.
    pub fn open_form(&mut self, task: Option<&Task>) {
        self.form = Some(match task {
            Some(task) => TaskForm::edit(task),
            None => TaskForm::create(),
        });
    }

    pub fn close_form(&mut self) {
        self.form = None;
    }

    /// Saves the open form. On failure the form stays open.
    pub async fn submit_form(&mut self) -> ClientResult<()> {
        let Some(form) = self.form.clone() else {
            return Ok(());
        };
        let token = self.token()?;

        let saved = match &form.editing {
            Some(id) => {
                let patch = TaskPatch {
                    title: Some(form.title),
                    description: Some(form.description),
                    completed: None,
                };
                self.api.update_task(&token, id, &patch).await
            }
            None => {
                let task = NewTask::new(form.title, Some(form.description));
                self.api.create_task(&token, &task).await
            }
        };
        saved.map_err(|e| logged("save task", e))?;

        self.close_form();
        self.refresh().await
    }

    pub async fn toggle_complete(&mut self, task_id: &str) -> ClientResult<()> {
        let token = self.token()?;
        let completed = self
            .tasks
            .iter()
            .find(|task| task.id == task_id)
            .map(|task| task.completed)
            .ok_or_else(|| ClientError::UnknownTask(task_id.to_string()))?;

        self.api
            .update_task(&token, task_id, &TaskPatch::completed(!completed))
            .await
            .map_err(|e| logged("update task", e))?;
        self.refresh().await
    }

    pub async fn delete(&mut self, task_id: &str) -> ClientResult<()> {
        let token = self.token()?;
        self.api
            .delete_task(&token, task_id)
            .await
            .map_err(|e| logged("delete task", e))?;
        self.refresh().await
    }

    /// Forgets the session locally and returns to the login view.
    ///
    /// In-memory state is dropped even when the store cannot be cleared.
    pub fn logout(&mut self) -> ClientResult<()> {
        self.token = None;
        self.user = None;
        self.tasks.clear();
        self.form = None;
        self.view = View::Login;
        self.store.clear()?;
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let user = match (self.view, &self.user) {
            (View::Tasks, Some(user)) => user,
            _ => {
                out.push_str("Please log in\n");
                return out;
            }
        };

        let _ = writeln!(out, "Welcome, {}!", user.username);
        out.push_str("Your Tasks\n");
        if self.tasks.is_empty() {
            out.push_str("  (no tasks yet)\n");
        }
        for task in &self.tasks {
            let mark = if task.completed { 'x' } else { ' ' };
            if task.description.is_empty() {
                let _ = writeln!(out, "[{}] {}", mark, task.title);
            } else {
                let _ = writeln!(out, "[{}] {} - {}", mark, task.title, task.description);
            }
        }

        if let Some(form) = &self.form {
            let heading = if form.is_edit() { "Edit Task" } else { "Add Task" };
            let _ = writeln!(out, "{}: {}", heading, form.title);
        }
        out
    }
}

fn logged(action: &str, err: ClientError) -> ClientError {
    error!(action = %action, error = %err, "Task client request failed");
    err
}
