use mockito::{Matcher, Server};
use serde_json::json;
use survey_wizard::error::{FetchError, SubmissionError};
use survey_wizard::models::{AnswerValue, FinalSubmission, PageIndex, PageSubmission};
use survey_wizard::services::{QuestionProvider, SurveyBackend};
use survey_wizard::{Config, SurveyClient};

fn client_for(server: &Server) -> SurveyClient {
    let config = Config {
        api_base_url: format!("{}/", server.url()),
        request_timeout_secs: 5,
        ..Config::default()
    };
    SurveyClient::new(&config).unwrap()
}

fn page(n: u8) -> PageIndex {
    PageIndex::new(n).unwrap()
}

#[tokio::test]
async fn fetch_first_page_without_identity() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/get_survey_page/1")
        .match_query(Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"questions":[
                {"type":"text","question":"Please enter your name."},
                {"type":"score","question":"DSE Chinese"},
                {"type":"score","question":"DSE English"},
                {"type":"score","question":"DSE Math"},
                {"type":"score","question":"DSE Elective 1"},
                {"type":"score","question":"DSE Elective 2"}
            ]}"#,
        )
        .create_async()
        .await;

    let client = client_for(&server);
    assert!(!client.base_url().ends_with('/'));

    let set = client.fetch(page(1), None).await.unwrap();
    mock.assert_async().await;

    assert_eq!(set.page, page(1));
    assert_eq!(set.len(), 6);
    assert_eq!(set.questions[0].text, "Please enter your name.");
    assert_eq!(set.personality_hint, None);
}

#[tokio::test]
async fn fetch_last_page_carries_identity_and_codes() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/get_survey_page/6")
        .match_query(Matcher::UrlEncoded("user_name".into(), "Alice Chan".into()))
        .with_status(200)
        .with_body(
            json!({
                "questions": [
                    {"question": "Engineering?", "category": "Engineering"},
                    {"question": "Medicine?", "category": "Medicine"},
                    {"question": "Arts?", "category": "Arts"}
                ],
                "holland_codes": "RIA / RAI"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let set = client_for(&server)
        .fetch(page(6), Some("Alice Chan"))
        .await
        .unwrap();
    mock.assert_async().await;

    assert_eq!(set.len(), 3);
    assert_eq!(set.questions[1].category.as_deref(), Some("Medicine"));
    assert_eq!(set.personality_hint.as_deref(), Some("RIA / RAI"));
}

#[tokio::test]
async fn fetch_last_page_without_identity_sends_nothing() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let err = client_for(&server).fetch(page(6), None).await.unwrap_err();
    mock.assert_async().await;
    assert!(matches!(err, FetchError::MissingIdentity { .. }));
}

#[tokio::test]
async fn fetch_error_status_keeps_detail() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/get_survey_page/3")
        .with_status(404)
        .with_body(r#"{"detail":"Page not found"}"#)
        .create_async()
        .await;

    let err = client_for(&server).fetch(page(3), None).await.unwrap_err();
    match err {
        FetchError::Status { status, detail, .. } => {
            assert_eq!(status, 404);
            assert_eq!(detail.as_deref(), Some("Page not found"));
        }
        other => panic!("应为 Status 错误: {:?}", other),
    }
}

#[tokio::test]
async fn fetch_malformed_body() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/get_survey_page/2")
        .with_status(200)
        .with_body("<html>oops</html>")
        .create_async()
        .await;

    let err = client_for(&server).fetch(page(2), None).await.unwrap_err();
    assert!(matches!(err, FetchError::Malformed { .. }));
}

#[tokio::test]
async fn submit_page_posts_page_answers() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/submit_survey_page/")
        .match_body(Matcher::Json(json!({
            "user_name": "Alice",
            "page_number": 1,
            "answers": ["Alice", 5, 6, 4, 5, 7]
        })))
        .with_status(200)
        .with_body(r#"{"message":"ok"}"#)
        .create_async()
        .await;

    let mut answers = vec![AnswerValue::Text("Alice".to_string())];
    answers.extend([5, 6, 4, 5, 7].map(AnswerValue::Integer));
    let submission = PageSubmission {
        user_name: "Alice".to_string(),
        page_number: page(1),
        answers,
    };

    client_for(&server).submit_page(&submission).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn submit_final_rejection_surfaces_detail() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/submit_survey/")
        .match_body(Matcher::PartialJson(json!({
            "user_name": "Alice",
            "dse_scores": [5, 6, 4, 5, 7]
        })))
        .with_status(500)
        .with_body(r#"{"detail":"server error"}"#)
        .create_async()
        .await;

    let submission = FinalSubmission {
        user_name: "Alice".to_string(),
        answers: vec![AnswerValue::Text("yes".to_string()); 49],
        dse_scores: vec![5, 6, 4, 5, 7],
    };
    let err = client_for(&server)
        .submit_final(&submission)
        .await
        .unwrap_err();
    mock.assert_async().await;

    assert!(matches!(err, SubmissionError::Rejected { status: 500, .. }));
    assert_eq!(err.respondent_message(), "server error");
}

#[tokio::test]
async fn structured_detail_is_rendered_as_json() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/submit_survey_page/")
        .with_status(422)
        .with_body(r#"{"detail":[{"loc":["body","answers"],"msg":"field required"}]}"#)
        .create_async()
        .await;

    let submission = PageSubmission {
        user_name: "Alice".to_string(),
        page_number: page(2),
        answers: vec![AnswerValue::Text("yes".to_string()); 10],
    };
    let err = client_for(&server)
        .submit_page(&submission)
        .await
        .unwrap_err();

    let message = err.respondent_message();
    assert!(message.contains("field required"), "{}", message);
}

#[tokio::test]
async fn rejection_without_body_uses_generic_message() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/submit_survey/")
        .with_status(502)
        .create_async()
        .await;

    let submission = FinalSubmission {
        user_name: "Alice".to_string(),
        answers: vec![AnswerValue::Text("no".to_string()); 49],
        dse_scores: vec![1, 1, 1, 1, 1],
    };
    let err = client_for(&server)
        .submit_final(&submission)
        .await
        .unwrap_err();
    assert_eq!(
        err.respondent_message(),
        survey_wizard::error::GENERIC_SUBMIT_MESSAGE
    );
}
