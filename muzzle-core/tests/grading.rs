use muzzle_core::{ClientResult, GradingRequest, Status, grade};

const TEST: &str = "Muzzle.expect([[1,2],[1,3]])";

fn status_of(request: &str) -> Status {
    let request: GradingRequest = serde_json::from_str(request).unwrap();
    grade(&request).status
}

#[test]
fn exact_layout_passes() {
    let request = GradingRequest {
        test: TEST.into(),
        content: r#"{"positions":[[100,200],[100,300]]}"#.into(),
        client_result: None,
    };
    let response = serde_json::to_value(grade(&request)).unwrap();
    assert_eq!(response, serde_json::json!({"status": "passed", "feedback": ""}));
}

#[test]
fn misplaced_piece_fails() {
    let request = GradingRequest {
        test: TEST.into(),
        content: r#"{"positions":[[100,200],[100,400]]}"#.into(),
        client_result: None,
    };
    assert_eq!(grade(&request).status, Status::Failed);
}

#[test]
fn uniformly_shifted_layout_passes() {
    let request = GradingRequest {
        test: TEST.into(),
        content: r#"{"positions":[[200,300],[200,400]]}"#.into(),
        client_result: None,
    };
    assert_eq!(grade(&request).status, Status::Passed);
}

#[test]
fn failed_client_result_wins() {
    let request = GradingRequest {
        test: TEST.into(),
        content: r#"{"positions":[[100,200],[100,300]]}"#.into(),
        client_result: Some(ClientResult {
            status: Status::Failed,
        }),
    };
    assert_eq!(grade(&request).status, Status::Failed);
}

#[test]
fn no_expectation_passes_anything() {
    let request = GradingRequest {
        test: "Muzzle.basic(3, 3, 'board.png')".into(),
        content: r#"{"positions":[[0,0],[999,999]]}"#.into(),
        client_result: None,
    };
    assert_eq!(grade(&request).status, Status::Passed);
}

#[test]
fn requests_parse_from_the_wire() {
    assert_eq!(
        status_of(
            r#"{"test":"Muzzle.expect([[0,0]])","content":"[[5,5]]","client_result":{"status":"failed"}}"#
        ),
        Status::Failed
    );
    assert_eq!(status_of(r#"{"content":"[[5,5]]"}"#), Status::Passed);
}
