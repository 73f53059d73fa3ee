/// Integration tests with mocked Kickbox and HubSpot APIs
/// Drives every invocation context end to end without hitting real services
use kickbox_hubspot_api::config::Config;
use kickbox_hubspot_api::invocation_models::OutputFields;
use kickbox_hubspot_api::pipeline::{dispatch, InvocationContext, InvocationResponse, VerificationPipeline};
use serde_json::{json, Value};
use wiremock::matchers::{any, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create test config
fn create_test_config(kickbox: &MockServer, hubspot: &MockServer) -> Config {
    Config {
        port: 3000,
        kickbox_api_key: Some("test_key".to_string()),
        hubspot_access_token: Some("test_token".to_string()),
        kickbox_base_url: kickbox.uri(),
        hubspot_base_url: hubspot.uri(),
        function_secret: None,
        http_timeout_secs: Some(5),
    }
}

fn deliverable(email: &str) -> Value {
    json!({
        "result": "deliverable",
        "reason": "accepted_email",
        "role": false,
        "free": true,
        "disposable": false,
        "accept_all": false,
        "did_you_mean": null,
        "sendex": 0.9,
        "email": email,
        "user": "jane",
        "domain": "example.com",
        "success": true,
        "message": null
    })
}

async fn mount_kickbox(server: &MockServer, email: &str, body: Value, calls: u64) {
    Mock::given(method("GET"))
        .and(path("/v2/verify"))
        .and(query_param("email", email))
        .and(query_param("apikey", "test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(calls)
        .mount(server)
        .await;
}

async fn mount_contact(server: &MockServer, id: &str, properties: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/crm/v3/objects/contacts/{}", id)))
        .and(query_param("properties", "email,hs_object_id"))
        .and(header("authorization", "Bearer test_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "properties": properties,
                "archived": false
            })),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_update(server: &MockServer, id: &str, calls: u64) {
    Mock::given(method("PATCH"))
        .and(path(format!("/crm/v3/objects/contacts/{}", id)))
        .and(header("authorization", "Bearer test_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": id})))
        .expect(calls)
        .mount(server)
        .await;
}

async fn forbid_all(server: &MockServer) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

/// Properties of the single PATCH the CRM mock received.
async fn patched_properties(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    let patch = requests
        .iter()
        .find(|r| r.method.as_str() == "PATCH")
        .expect("no PATCH request received");
    patch.body_json::<Value>().unwrap()["properties"].clone()
}

fn function_body(response: InvocationResponse) -> (u16, Value) {
    match response {
        InvocationResponse::Function(envelope) => {
            let body = envelope.body_json().unwrap();
            (envelope.status_code, body)
        }
        other => panic!("Expected function envelope, got {:?}", other),
    }
}

#[tokio::test]
async fn test_on_demand_verifies_and_updates_contact() {
    let kickbox = MockServer::start().await;
    let hubspot = MockServer::start().await;

    mount_kickbox(&kickbox, "jane@example.com", deliverable("jane@example.com"), 1).await;
    Mock::given(method("PATCH"))
        .and(path("/crm/v3/objects/contacts/101"))
        .and(body_partial_json(json!({
            "properties": {
                "kickbox_result": "deliverable",
                "kickbox_reason": "accepted_email",
                "kickbox_free": "true",
                "kickbox_role": "false",
                "kickbox_sendex": "0.9",
                "kickbox_success": "true",
                "kickbox_email_normalized": "jane@example.com"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "101"})))
        .expect(1)
        .mount(&hubspot)
        .await;

    let pipeline = VerificationPipeline::new(&create_test_config(&kickbox, &hubspot));
    let context = InvocationContext::OnDemand {
        contact_id: Some("101".to_string()),
        email: Some("jane@example.com".to_string()),
    };

    let (status, body) = function_body(dispatch(pipeline.as_ref(), context).await);

    assert_eq!(status, 200);
    assert_eq!(body["message"], "Email verified and contact updated successfully!");
    assert_eq!(body["kickbox_result"], "deliverable");
    assert_eq!(body["kickbox_free"], true);
    assert_eq!(body["kickbox_sendex"], 0.9);

    // Absent fields are not written; the reported date is the written one
    let properties = patched_properties(&hubspot).await;
    assert!(properties.get("kickbox_did_you_mean").is_none());
    assert_eq!(
        properties["kickbox_verification_date"],
        body["kickbox_verification_date"]
    );
    let date = properties["kickbox_verification_date"].as_str().unwrap();
    assert!(date.ends_with('Z'));
    assert_eq!(date.len(), "2024-05-01T10:00:00.000Z".len());
}

#[tokio::test]
async fn test_string_encoded_provider_fields_are_coerced() {
    let kickbox = MockServer::start().await;
    let hubspot = MockServer::start().await;

    mount_kickbox(
        &kickbox,
        "a@b.com",
        json!({
            "result": "risky",
            "free": "TRUE",
            "accept_all": "true",
            "role": "no",
            "sendex": "0.5",
            "success": "true"
        }),
        1,
    )
    .await;
    mount_update(&hubspot, "7", 1).await;

    let pipeline = VerificationPipeline::new(&create_test_config(&kickbox, &hubspot));
    let (status, _) = function_body(
        dispatch(
            pipeline.as_ref(),
            InvocationContext::OnDemand {
                contact_id: Some("7".to_string()),
                email: Some("a@b.com".to_string()),
            },
        )
        .await,
    );
    assert_eq!(status, 200);

    let properties = patched_properties(&hubspot).await;
    assert_eq!(properties["kickbox_free"], "true");
    assert_eq!(properties["kickbox_accept_all"], "true");
    assert_eq!(properties["kickbox_role"], "false");
    assert_eq!(properties["kickbox_disposable"], "false");
    assert_eq!(properties["kickbox_sendex"], "0.5");
    assert!(properties.get("kickbox_reason").is_none());
}

#[tokio::test]
async fn test_configuration_error_precedes_validation() {
    let kickbox = MockServer::start().await;
    let hubspot = MockServer::start().await;
    forbid_all(&kickbox).await;
    forbid_all(&hubspot).await;

    let mut config = create_test_config(&kickbox, &hubspot);
    config.kickbox_api_key = None;
    let pipeline = VerificationPipeline::new(&config);

    let (status, body) = function_body(
        dispatch(
            pipeline.as_ref(),
            InvocationContext::OnDemand {
                contact_id: None,
                email: None,
            },
        )
        .await,
    );

    assert_eq!(status, 500);
    assert_eq!(body["error"], "configuration_error");
    assert_eq!(body["message"], "Kickbox API key not configured.");

    let mut config = create_test_config(&kickbox, &hubspot);
    config.hubspot_access_token = None;
    let pipeline = VerificationPipeline::new(&config);

    match dispatch(
        pipeline.as_ref(),
        InvocationContext::WorkflowAuto {
            object_id: Some("101".to_string()),
        },
    )
    .await
    {
        InvocationResponse::Workflow(Err(err)) => {
            assert_eq!(err.kind(), "configuration_error");
            assert_eq!(err.message(), "HubSpot Access Token not configured.");
        }
        other => panic!("Expected workflow failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_validation_makes_no_network_call() {
    let kickbox = MockServer::start().await;
    let hubspot = MockServer::start().await;
    forbid_all(&kickbox).await;
    forbid_all(&hubspot).await;

    let pipeline = VerificationPipeline::new(&create_test_config(&kickbox, &hubspot));

    let (status, body) = function_body(
        dispatch(
            pipeline.as_ref(),
            InvocationContext::OnDemand {
                contact_id: Some("101".to_string()),
                email: Some("".to_string()),
            },
        )
        .await,
    );
    assert_eq!(status, 400);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["message"], "Missing 'email' or 'contactId' in request.");

    match dispatch(pipeline.as_ref(), InvocationContext::WorkflowAuto { object_id: None }).await {
        InvocationResponse::Workflow(Err(err)) => {
            assert_eq!(err.kind(), "validation_error");
            assert_eq!(
                err.message(),
                "Contact ID is missing from the request. Cannot proceed."
            );
        }
        other => panic!("Expected workflow failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_provider_error_field_skips_crm_update() {
    let kickbox = MockServer::start().await;
    let hubspot = MockServer::start().await;

    mount_kickbox(
        &kickbox,
        "jane@example.com",
        json!({"success": false, "message": "Invalid API key", "error": "invalid_api_key"}),
        1,
    )
    .await;
    forbid_all(&hubspot).await;

    let pipeline = VerificationPipeline::new(&create_test_config(&kickbox, &hubspot));
    let (status, body) = function_body(
        dispatch(
            pipeline.as_ref(),
            InvocationContext::OnDemand {
                contact_id: Some("101".to_string()),
                email: Some("jane@example.com".to_string()),
            },
        )
        .await,
    );

    assert_eq!(status, 502);
    assert_eq!(body["error"], "provider_error");
    assert_eq!(body["message"], "Kickbox API error: invalid_api_key");
    assert!(body.get("verification").is_none());
}

#[tokio::test]
async fn test_provider_non_success_status() {
    let kickbox = MockServer::start().await;
    let hubspot = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/verify"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .expect(1)
        .mount(&kickbox)
        .await;
    forbid_all(&hubspot).await;

    let pipeline = VerificationPipeline::new(&create_test_config(&kickbox, &hubspot));
    let (status, body) = function_body(
        dispatch(
            pipeline.as_ref(),
            InvocationContext::OnDemand {
                contact_id: Some("101".to_string()),
                email: Some("jane@example.com".to_string()),
            },
        )
        .await,
    );

    assert_eq!(status, 502);
    assert_eq!(
        body["message"],
        "Failed to verify email with Kickbox: Kickbox API responded with status: 403 - Forbidden"
    );
    // The API key never leaks into caller-facing messages
    assert!(!body.to_string().contains("test_key"));
}

#[tokio::test]
async fn test_crm_write_failure_reports_unpersisted_verification() {
    let kickbox = MockServer::start().await;
    let hubspot = MockServer::start().await;

    // One call from the function context, one from the workflow context
    mount_kickbox(&kickbox, "jane@example.com", deliverable("jane@example.com"), 2).await;
    Mock::given(method("PATCH"))
        .and(path("/crm/v3/objects/contacts/101"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": "error",
            "message": "Property \"kickbox_result\" does not exist"
        })))
        .expect(2)
        .mount(&hubspot)
        .await;

    let pipeline = VerificationPipeline::new(&create_test_config(&kickbox, &hubspot));
    let (status, body) = function_body(
        dispatch(
            pipeline.as_ref(),
            InvocationContext::OnDemand {
                contact_id: Some("101".to_string()),
                email: Some("jane@example.com".to_string()),
            },
        )
        .await,
    );

    assert_eq!(status, 502);
    assert_eq!(body["error"], "crm_write_error");
    assert_eq!(
        body["message"],
        "Failed to update HubSpot contact: 400 Property \"kickbox_result\" does not exist"
    );
    assert_eq!(body["verification"]["kickbox_result"], "deliverable");

    // Workflow contexts report the failure without partial output
    match dispatch(
        pipeline.as_ref(),
        InvocationContext::WorkflowInputField {
            object_id: Some("101".to_string()),
            email: Some("jane@example.com".to_string()),
            callback_id: None,
        },
    )
    .await
    {
        InvocationResponse::Completion(completion) => {
            assert!(!completion.success);
            assert!(completion.output_fields.is_none());
            assert!(completion.message.starts_with("Failed to update HubSpot contact"));
        }
        other => panic!("Expected completion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_workflow_auto_resolves_email_from_crm() {
    let kickbox = MockServer::start().await;
    let hubspot = MockServer::start().await;

    mount_contact(
        &hubspot,
        "101",
        json!({"email": "jane@example.com", "hs_object_id": "101"}),
    )
    .await;
    mount_kickbox(&kickbox, "jane@example.com", deliverable("jane@example.com"), 1).await;
    mount_update(&hubspot, "101", 1).await;

    let pipeline = VerificationPipeline::new(&create_test_config(&kickbox, &hubspot));
    let response = dispatch(
        pipeline.as_ref(),
        InvocationContext::WorkflowAuto {
            object_id: Some("101".to_string()),
        },
    )
    .await;

    let output = match response {
        InvocationResponse::Workflow(Ok(output)) => output,
        other => panic!("Expected workflow output, got {:?}", other),
    };
    assert_eq!(
        output.message,
        "Email verified for contact 101 (jane@example.com). Result: deliverable"
    );

    let wire = serde_json::to_value(&output).unwrap();
    assert_eq!(wire["outputFields"]["verifiedContactId"], "101");
    assert_eq!(wire["outputFields"]["verifiedEmail"], "jane@example.com");
    assert_eq!(wire["outputFields"]["kickbox_result"], "deliverable");
    assert_eq!(wire["outputFields"]["kickbox_success"], true);
}

#[tokio::test]
async fn test_workflow_auto_skips_contact_without_email() {
    let kickbox = MockServer::start().await;
    let hubspot = MockServer::start().await;

    mount_contact(&hubspot, "55", json!({"email": null, "hs_object_id": "55"})).await;
    forbid_all(&kickbox).await;
    mount_update(&hubspot, "55", 0).await;

    let pipeline = VerificationPipeline::new(&create_test_config(&kickbox, &hubspot));
    let response = dispatch(
        pipeline.as_ref(),
        InvocationContext::WorkflowAuto {
            object_id: Some("55".to_string()),
        },
    )
    .await;

    match response {
        InvocationResponse::Workflow(Ok(output)) => {
            assert_eq!(
                output.message,
                "Contact 55 has no email. No verification performed."
            );
            match output.output_fields {
                OutputFields::Skipped(fields) => {
                    assert_eq!(fields.kickbox_result, "no_email");
                    assert_eq!(fields.kickbox_reason, "Contact has no email property");
                    assert!(!fields.kickbox_success);
                }
                other => panic!("Expected skipped fields, got {:?}", other),
            }
        }
        other => panic!("Expected workflow output, got {:?}", other),
    }
}

#[tokio::test]
async fn test_direct_call_fails_for_contact_without_email() {
    let kickbox = MockServer::start().await;
    let hubspot = MockServer::start().await;

    mount_contact(&hubspot, "55", json!({"email": ""})).await;
    forbid_all(&kickbox).await;

    let pipeline = VerificationPipeline::new(&create_test_config(&kickbox, &hubspot));
    let (status, body) = function_body(
        dispatch(
            pipeline.as_ref(),
            InvocationContext::Direct {
                contact_id: Some("55".to_string()),
                email: None,
            },
        )
        .await,
    );

    assert_eq!(status, 400);
    assert_eq!(body["message"], "Contact 55 has no email. Cannot verify.");
}

#[tokio::test]
async fn test_crm_read_failure_stops_before_provider() {
    let kickbox = MockServer::start().await;
    let hubspot = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/crm/v3/objects/contacts/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": "error",
            "message": "resource not found"
        })))
        .expect(1)
        .mount(&hubspot)
        .await;
    forbid_all(&kickbox).await;

    let pipeline = VerificationPipeline::new(&create_test_config(&kickbox, &hubspot));
    match dispatch(
        pipeline.as_ref(),
        InvocationContext::WorkflowAuto {
            object_id: Some("404".to_string()),
        },
    )
    .await
    {
        InvocationResponse::Workflow(Err(err)) => {
            assert_eq!(err.kind(), "crm_read_error");
            assert_eq!(
                err.message(),
                "Failed to fetch contact from HubSpot: 404 resource not found"
            );
        }
        other => panic!("Expected workflow failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_input_field_email_skips_crm_read() {
    let kickbox = MockServer::start().await;
    let hubspot = MockServer::start().await;

    mount_kickbox(&kickbox, "input@example.com", deliverable("input@example.com"), 1).await;
    mount_update(&hubspot, "9", 1).await;

    let pipeline = VerificationPipeline::new(&create_test_config(&kickbox, &hubspot));
    let response = dispatch(
        pipeline.as_ref(),
        InvocationContext::WorkflowInputField {
            object_id: Some("9".to_string()),
            email: Some("input@example.com".to_string()),
            callback_id: Some("cb-42".to_string()),
        },
    )
    .await;

    match response {
        InvocationResponse::Completion(completion) => {
            assert!(completion.success);
            assert_eq!(completion.callback_id.as_deref(), Some("cb-42"));
            let wire = serde_json::to_value(&completion).unwrap();
            assert_eq!(wire["outputFields"]["verifiedEmail"], "input@example.com");
        }
        other => panic!("Expected completion, got {:?}", other),
    }

    let requests = hubspot.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.as_str() != "GET"));
}
