use mail_assist::content_script::Effect;
use mail_assist::injector::{Activation, Reconciled};
use mail_assist::locator::Host;
use mail_assist::{AssistConfig, BrowserSession, HostPage, LaunchOptions, TabDriver};
use std::time::{Duration, Instant};

fn data_url(html: &str) -> String {
    format!("data:text/html,{}", urlencoding::encode(html))
}

fn attach(html: &str) -> TabDriver {
    let session = BrowserSession::launch(LaunchOptions::new().headless(true)).expect("Failed to launch browser");
    let mut driver = TabDriver::attach(session, AssistConfig::default().into_shared()).expect("Failed to attach");
    driver.navigate(&data_url(html)).expect("Failed to navigate");
    driver
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_trigger_injected_into_toolbar() {
    let driver = attach(r#"<html><body><div role="toolbar" id="tb"></div></body></html>"#);

    let page = driver.script().page();
    assert!(page.has_id("smart-email-assistant-btn").unwrap());
    assert!(page.exists("#tb #smart-email-assistant-btn").unwrap());
}

#[test]
#[ignore]
fn test_trigger_restored_after_rerender() {
    let mut driver = attach(r#"<html><body><div id="app"><div role="toolbar"></div></div></body></html>"#);
    driver
        .script()
        .page()
        .tab()
        .evaluate(
            "document.getElementById('app').innerHTML = '<div role=\"toolbar\"></div>'; true",
            false,
        )
        .expect("Failed to re-render");

    let start = Instant::now();
    let effects = driver.pump(start).unwrap();
    assert!(effects.contains(&Effect::ReconcileScheduled));

    let effects = driver.pump(start + Duration::from_millis(1000)).unwrap();
    assert!(effects.contains(&Effect::Reconciled { result: Reconciled::Anchored(Host::Gmail) }));
    assert!(driver.script().page().has_id("smart-email-assistant-btn").unwrap());
}

#[test]
#[ignore]
fn test_trigger_click_does_not_reach_host_handlers() {
    let mut driver = attach(
        r#"<html><body>
            <div role="toolbar" id="tb"></div>
            <div role="textbox" aria-label="Message Body">Hi</div>
            <script>
                window.hostClicks = 0;
                document.getElementById('tb').addEventListener('click', () => window.hostClicks++);
            </script>
        </body></html>"#,
    );

    let tab = driver.script().page().tab().clone();
    tab.find_element("#smart-email-assistant-btn")
        .expect("Trigger not found")
        .click()
        .expect("Failed to click trigger");

    let host_clicks = tab.evaluate("window.hostClicks", false).expect("Failed to read counter");
    assert_eq!(host_clicks.value, Some(serde_json::json!(0)));
    assert!(driver.pump(Instant::now()).unwrap().iter().any(|effect| matches!(effect, Effect::Activated { .. })));
}

#[test]
#[ignore]
fn test_click_opens_overlay() {
    let mut driver = attach(
        r#"<html><body><div role="textbox" aria-label="Message Body">Are you free tomorrow?</div></body></html>"#,
    );

    driver
        .script()
        .page()
        .tab()
        .find_element("#smart-email-assistant-btn")
        .expect("Trigger not found")
        .click()
        .expect("Failed to click trigger");

    let effects = driver.pump(Instant::now()).unwrap();
    assert!(effects.iter().any(|effect| matches!(
        effect,
        Effect::Activated { activation: Activation::Opened { length: 22, .. } }
    )));
    assert!(driver.script().status().unwrap().overlay_open);
}

#[cfg(feature = "mcp-handler")]
#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn test_server_pump_restores_trigger_between_tool_calls() {
    use mail_assist::assistant::HttpReplyGenerator;
    use mail_assist::mcp::AssistServer;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    let driver = attach(r#"<html><body><div id="app"><div role="toolbar"></div></div></body></html>"#);
    let tab = driver.script().page().tab().clone();
    let generator = HttpReplyGenerator::new(&AssistConfig::default().backend).unwrap();
    let server = AssistServer::new(driver, Arc::new(generator));

    let cancel = CancellationToken::new();
    let pump = server.spawn_page_pump(cancel.clone());

    tab.evaluate("document.getElementById('app').innerHTML = '<div role=\"toolbar\"></div>'; true", false)
        .expect("Failed to re-render");
    tokio::time::sleep(Duration::from_millis(2000)).await;

    let present = tab
        .evaluate("document.querySelector('[role=\"toolbar\"] #smart-email-assistant-btn') !== null", false)
        .expect("Failed to query trigger");
    assert_eq!(present.value, Some(serde_json::json!(true)));

    cancel.cancel();
    pump.await.unwrap();
}
