//! HTTP client tests against a mock Assistants API

use autoproject_core::agents::reconcile;
use autoproject_core::config::ModelConfig;
use autoproject_core::{
    AgentService, Assistant, Error, MessageRole, OpenAiClient, Planner, Run, RunConfig, RunRequest, RunService,
    RunState, ThreadService, ToolDefinition, ToolOutputEntry,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_runs() -> RunConfig {
    RunConfig {
        poll_interval_ms: 10,
        timeout_secs: None,
    }
}

fn client(server: &MockServer) -> OpenAiClient {
    OpenAiClient::with_base_url(&server.uri(), "sk-test", fast_runs()).unwrap()
}

fn assistant_json(id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "object": "assistant",
        "name": name,
        "description": null,
        "instructions": "x",
        "model": "gpt-4o",
        "temperature": 0.2,
        "tools": []
    })
}

fn run_json(status: &str) -> serde_json::Value {
    json!({
        "id": "run_1",
        "object": "thread.run",
        "thread_id": "thread_1",
        "assistant_id": "asst_1",
        "status": status,
        "required_action": null,
        "last_error": null
    })
}

mod agent_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_follows_pagination() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/assistants"))
            .and(query_param_is_missing("after"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [assistant_json("asst_1", "a"), assistant_json("asst_2", "b")],
                "first_id": "asst_1",
                "last_id": "asst_2",
                "has_more": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/assistants"))
            .and(query_param("after", "asst_2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [assistant_json("asst_3", "c")],
                "first_id": "asst_3",
                "last_id": "asst_3",
                "has_more": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let agents = client(&server).list_agents().await.unwrap();
        let ids: Vec<_> = agents.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["asst_1", "asst_2", "asst_3"]);
    }

    #[tokio::test]
    async fn test_reconcile_updates_existing_identity() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/assistants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [assistant_json("asst_9", "launch-Ada-Researcher")],
                "has_more": false
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/assistants/asst_9"))
            .and(body_partial_json(json!({
                "name": "launch-Ada-Researcher",
                "instructions": "Your name is Ada. You are a Researcher. You research.",
                "description": "Researcher for project launch."
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(assistant_json("asst_9", "launch-Ada-Researcher")))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/assistants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(assistant_json("asst_new", "dup")))
            .expect(0)
            .mount(&server)
            .await;

        let assistant = Assistant::new("Ada", "Researcher", "You research.");
        let agent = reconcile(&client(&server), &assistant, "launch", &ModelConfig::default())
            .await
            .unwrap();
        assert_eq!(agent.id, "asst_9");
    }

    #[tokio::test]
    async fn test_error_status_becomes_remote_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/assistants/asst_gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"message": "No assistant found with id 'asst_gone'.", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let params = autoproject_core::AgentParams {
            name: "n".into(),
            description: "d".into(),
            instructions: "i".into(),
            model: "gpt-4o".into(),
            temperature: 0.2,
        };
        let err = client(&server).update_agent("asst_gone", &params).await.unwrap_err();

        let Error::Remote(message) = err else {
            panic!("expected remote error");
        };
        assert!(message.contains("POST /assistants/asst_gone returned 404"));
        assert!(message.contains("No assistant found"));
    }
}

mod thread_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_thread_sends_headers() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/threads"))
            .and(header("OpenAI-Beta", "assistants=v2"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thread_1", "object": "thread"})))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(client(&server).create_thread().await.unwrap(), "thread_1");
    }

    #[tokio::test]
    async fn test_add_and_read_latest_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/threads/thread_1/messages"))
            .and(body_json(json!({"role": "user", "content": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1", "role": "user",
                "content": [{"type": "text", "text": {"value": "hello", "annotations": []}}]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/threads/thread_1/messages"))
            .and(query_param("limit", "1"))
            .and(query_param("order", "desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "id": "msg_2", "role": "assistant",
                    "content": [{"type": "text", "text": {"value": "hi there", "annotations": []}}]
                }],
                "has_more": true
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let posted = client.add_message("thread_1", MessageRole::User, "hello").await.unwrap();
        assert_eq!(posted.content, "hello");

        let latest = client.latest_message("thread_1").await.unwrap().unwrap();
        assert_eq!(latest.role, MessageRole::Assistant);
        assert_eq!(latest.content, "hi there");
    }

    #[tokio::test]
    async fn test_empty_thread_has_no_latest_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/threads/thread_1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [], "has_more": false})))
            .mount(&server)
            .await;

        assert!(client(&server).latest_message("thread_1").await.unwrap().is_none());
    }
}

mod run_tests {
    use super::*;

    fn request(tools: Vec<ToolDefinition>) -> RunRequest {
        RunRequest {
            thread_id: "thread_1".into(),
            agent_id: "asst_1".into(),
            additional_instructions: Some("Ada, please research".into()),
            tools,
        }
    }

    #[tokio::test]
    async fn test_create_polls_until_settled() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/threads/thread_1/runs"))
            .and(body_partial_json(json!({
                "assistant_id": "asst_1",
                "additional_instructions": "Ada, please research",
                "tools": [{
                    "type": "function",
                    "function": {"name": "echo", "description": "Echo.", "parameters": {"type": "object"}}
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(run_json("queued")))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/threads/thread_1/runs/run_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(run_json("in_progress")))
            .up_to_n_times(2)
            .mount(&server)
            .await;

        let mut requires_action = run_json("requires_action");
        requires_action["required_action"] = json!({
            "type": "submit_tool_outputs",
            "submit_tool_outputs": {"tool_calls": [
                {"id": "call_a", "type": "function", "function": {"name": "echo", "arguments": "{}"}}
            ]}
        });
        Mock::given(method("GET"))
            .and(path("/threads/thread_1/runs/run_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(requires_action))
            .mount(&server)
            .await;

        let tools = vec![ToolDefinition {
            name: "echo".into(),
            description: "Echo.".into(),
            parameters: json!({"type": "object"}),
        }];
        let run = client(&server).create_and_poll(&request(tools)).await.unwrap();

        let RunState::RequiresToolInput { calls } = run.state else {
            panic!("expected tool input, got {:?}", run.state);
        };
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_a");
    }

    #[tokio::test]
    async fn test_submit_outputs() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/threads/thread_1/runs/run_1/submit_tool_outputs"))
            .and(body_json(json!({"tool_outputs": [
                {"tool_call_id": "call_a", "output": "1"},
                {"tool_call_id": "call_b", "output": "2"}
            ]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(run_json("completed")))
            .expect(1)
            .mount(&server)
            .await;

        let run = Run {
            id: "run_1".into(),
            thread_id: "thread_1".into(),
            state: RunState::RequiresToolInput { calls: vec![] },
        };
        let outputs = vec![
            ToolOutputEntry {
                tool_call_id: "call_a".into(),
                output: "1".into(),
            },
            ToolOutputEntry {
                tool_call_id: "call_b".into(),
                output: "2".into(),
            },
        ];

        let run = client(&server).submit_tool_outputs_and_poll(&run, &outputs).await.unwrap();
        assert_eq!(run.state, RunState::Completed);
    }

    #[tokio::test]
    async fn test_failed_run_carries_last_error() {
        let server = MockServer::start().await;

        let mut failed = run_json("failed");
        failed["last_error"] = json!({"code": "server_error", "message": "Something went wrong."});
        Mock::given(method("POST"))
            .and(path("/threads/thread_1/runs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(failed))
            .mount(&server)
            .await;

        let run = client(&server).create_and_poll(&request(vec![])).await.unwrap();
        assert_eq!(
            run.state,
            RunState::Failed {
                reason: "server_error: Something went wrong.".into()
            }
        );
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/threads/thread_1/runs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(run_json("queued")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/threads/thread_1/runs/run_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(run_json("in_progress")))
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url(
            &server.uri(),
            "sk-test",
            RunConfig {
                poll_interval_ms: 50,
                timeout_secs: Some(1),
            },
        )
        .unwrap();

        let err = client.create_and_poll(&request(vec![])).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(1)));
    }
}

mod planner_tests {
    use super::*;
    use std::collections::BTreeMap;

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn test_plan_from_reply() {
        let server = MockServer::start().await;
        let plan = json!({
            "reference": "blog-launch",
            "goals": ["Launch a blog"],
            "assistants": [{"name": "Ada", "role": "Writer", "instructions": "You write."}],
            "tasks": [{
                "title": "Draft",
                "instructions": "draft the first post",
                "assigned_to": {"name": "Ada", "role": "Writer", "instructions": "You write."},
                "functions": ["search_internet"]
            }],
            "requirements": [{"title": "CMS access", "description": "Publishing credentials"}]
        });

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(&plan.to_string())))
            .expect(1)
            .mount(&server)
            .await;

        let planner = Planner::new(client(&server), ModelConfig::default());
        let functions = BTreeMap::from([("search_internet".to_string(), "Searches.".to_string())]);
        let project = planner.plan(&["Launch a blog".into()], &functions).await.unwrap();

        assert_eq!(project.reference, "blog-launch");
        assert_eq!(project.tasks[0].functions, vec!["search_internet"]);
        assert_eq!(project.requirements.len(), 1);
    }

    #[tokio::test]
    async fn test_plan_rejects_unusable_reply() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"{"reference": "x"}"#)))
            .mount(&server)
            .await;

        let planner = Planner::new(client(&server), ModelConfig::default());
        let err = planner.plan(&["g".into()], &BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, Error::Planner(_)));
    }
}
