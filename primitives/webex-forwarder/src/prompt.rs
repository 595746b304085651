//! Interactive specification gathering.
//!
//! Asks, in order, for the credential, the optional target, the port, the
//! resource and the event. A rejected answer prints the reason and asks the
//! same question again; nothing advances until the answer is valid.

use std::io::Write;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use webex_common::{
    ConfigBuilder, ConfigError, EventSource, ForwardConfig, InputError, Person, ResourceSelection,
    catalog::{event_choices, parse_event_alias, parse_resource_alias, resource_choices},
    config::{parse_credential, parse_port, parse_target},
    verify_credential,
};

use crate::console;

/// Line-oriented question/answer over any input and output.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R, W> Prompter<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Asks once and returns the raw answer without its line ending.
    pub async fn ask(&mut self, question: &str) -> Result<String, InputError> {
        write!(self.output, "{}", console::question(question)).map_err(|_| InputError::Closed)?;
        self.output.flush().map_err(|_| InputError::Closed)?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .await
            .map_err(|_| InputError::Closed)?;
        if read == 0 {
            return Err(InputError::Closed);
        }

        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Asks until `validate` accepts the answer.
    pub async fn ask_until<T>(
        &mut self,
        question: &str,
        mut validate: impl FnMut(&str) -> Result<T, InputError>,
    ) -> Result<T, InputError> {
        loop {
            let answer = self.ask(question).await?;
            match validate(&answer) {
                Ok(value) => return Ok(value),
                Err(e) => self.error(&e.to_string())?,
            }
        }
    }

    pub fn answer(&mut self, text: &str) -> Result<(), InputError> {
        writeln!(self.output, "{}", console::answer(text)).map_err(|_| InputError::Closed)
    }

    pub fn error(&mut self, text: &str) -> Result<(), InputError> {
        writeln!(self.output, "{}", console::error(text)).map_err(|_| InputError::Closed)
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}

/// Why gathering stopped before producing a configuration.
#[derive(Error, Debug)]
pub enum GatherError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// What the prompts produced.
pub struct Gathered {
    pub config: ForwardConfig,
    pub source: Arc<dyn EventSource>,
    pub person: Person,
}

/// Walks the operator through every step.
///
/// `connect` builds a platform client for a candidate credential. When
/// `prompt_target` is false, `target` (or the default host) is used as is.
pub async fn gather<R, W, F>(
    prompter: &mut Prompter<R, W>,
    mut connect: F,
    prompt_target: bool,
    target: Option<String>,
) -> Result<Gathered, GatherError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    F: FnMut(&str) -> Arc<dyn EventSource>,
{
    let (credential, source, person) = loop {
        let credential = prompter
            .ask_until("Enter your access token", parse_credential)
            .await?;

        let source = connect(&credential);
        match verify_credential(source.as_ref()).await {
            Ok(person) => break (credential, source, person),
            Err(e) => prompter.error(&e.to_string())?,
        }
    };

    let mut builder = ConfigBuilder::new().credential(credential);

    if prompt_target {
        let target = prompter
            .ask_until("Enter the host you will forward messages to", parse_target)
            .await?;
        builder = builder.target(target);
    } else if let Some(target) = target {
        builder = builder.target(target);
    }

    let port = prompter
        .ask_until("Enter a port you will forward messages to", parse_port)
        .await?;
    prompter.answer(&port.to_string())?;
    builder = builder.port(port);

    let resource = prompter
        .ask_until(
            &format!("Select resource {}", resource_choices()),
            parse_resource_alias,
        )
        .await?;

    builder = match resource {
        ResourceSelection::All => {
            prompter.answer("ALL")?;
            builder.firehose()
        }
        ResourceSelection::One(resource) => {
            prompter.answer(&resource.name().to_uppercase())?;

            let event = prompter
                .ask_until(
                    &format!("Select event {}", event_choices(resource)),
                    |answer| parse_event_alias(resource, answer),
                )
                .await?;
            prompter.answer(&event.name().to_uppercase())?;

            builder.select(ResourceSelection::One(resource), event)
        }
    };

    Ok(Gathered {
        config: builder.build()?,
        source,
        person,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::broadcast;
    use webex_common::{EventSelection, PlatformError, PlatformEvent, Resource};

    struct FakeSource {
        credential: String,
    }

    #[async_trait]
    impl EventSource for FakeSource {
        async fn whoami(&self) -> Result<Person, PlatformError> {
            if self.credential != "good" {
                return Err(PlatformError::NotAuthenticated);
            }
            Ok(Person {
                id: "p1".into(),
                display_name: "Alice Example".into(),
                emails: vec![],
            })
        }

        async fn listen(
            &self,
            _resource: Resource,
        ) -> Result<broadcast::Receiver<PlatformEvent>, PlatformError> {
            Err(PlatformError::ConnectionClosed)
        }

        async fn stop_listening(&self, _resource: Resource) {}
    }

    fn connect(credential: &str) -> Arc<dyn EventSource> {
        Arc::new(FakeSource {
            credential: credential.to_string(),
        })
    }

    async fn run(input: &str, prompt_target: bool) -> (Result<Gathered, GatherError>, String) {
        let mut prompter = Prompter::new(input.as_bytes(), Vec::new());
        let result = gather(&mut prompter, connect, prompt_target, None).await;
        let output = String::from_utf8(prompter.into_output()).unwrap();
        (result, output)
    }

    #[tokio::test]
    async fn single_resource_and_event() {
        let (result, _) = run("good\n8080\nm\nc\n", false).await;
        let gathered = result.unwrap();

        assert_eq!(gathered.config.credential, "good");
        assert_eq!(gathered.config.port, 8080);
        assert_eq!(gathered.config.target, "localhost");
        assert_eq!(gathered.person.display_name, "Alice Example");
        assert_eq!(
            gathered.config.selection,
            vec![(Resource::Messages, EventSelection::One("created"))]
        );
    }

    #[tokio::test]
    async fn empty_answers_repeat_the_same_question() {
        let (result, output) = run("\n\ngood\n\n8080\n\nr\n\na\n", false).await;
        let gathered = result.unwrap();

        assert_eq!(output.matches("Enter your access token").count(), 3);
        assert_eq!(output.matches("Enter a port").count(), 2);
        assert_eq!(output.matches("Select resource").count(), 2);
        assert_eq!(output.matches("Select event").count(), 2);
        assert_eq!(output.matches("token empty").count(), 2);
        assert_eq!(output.matches("port empty").count(), 1);
        assert_eq!(output.matches("response empty").count(), 2);
        assert_eq!(
            gathered.config.selection,
            vec![(Resource::Rooms, EventSelection::All)]
        );
    }

    #[tokio::test]
    async fn non_numeric_port_is_rejected() {
        let (result, output) = run("good\neighty\n80x\n3000\naa\nc\n", false).await;

        assert_eq!(result.unwrap().config.port, 3000);
        assert_eq!(output.matches("not a number").count(), 2);
    }

    #[tokio::test]
    async fn rejected_credential_restarts_at_token() {
        let (result, output) = run("expired\ngood\n8080\na\n", false).await;
        let gathered = result.unwrap();

        assert_eq!(gathered.config.credential, "good");
        assert_eq!(output.matches("not authenticated").count(), 1);
        assert_eq!(output.matches("Enter your access token").count(), 2);
    }

    #[tokio::test]
    async fn all_resources_skip_the_event_prompt() {
        let (result, output) = run("good\n8080\na\n", false).await;
        let gathered = result.unwrap();

        assert!(!output.contains("Select event"));
        assert_eq!(gathered.config.selection.len(), 4);
        assert!(
            gathered
                .config
                .selection
                .iter()
                .all(|(_, e)| *e == EventSelection::All)
        );
    }

    #[tokio::test]
    async fn event_outside_pool_is_invalid() {
        let (result, output) = run("good\n8080\nr\nd\nu\n", false).await;

        assert!(output.contains("event invalid"));
        assert_eq!(
            result.unwrap().config.selection,
            vec![(Resource::Rooms, EventSelection::One("updated"))]
        );
    }

    #[tokio::test]
    async fn target_prompt_when_requested() {
        let (result, output) = run("good\n\nrelay.internal\n9000\nmm\nd\n", true).await;
        let gathered = result.unwrap();

        assert_eq!(output.matches("target empty").count(), 1);
        assert_eq!(gathered.config.target, "relay.internal");
        assert_eq!(gathered.config.forward_url(), "http://relay.internal:9000/");
    }

    #[tokio::test]
    async fn closed_input_stops_gathering() {
        let (result, _) = run("good\n", false).await;
        assert!(matches!(
            result,
            Err(GatherError::Input(InputError::Closed))
        ));
    }
}
