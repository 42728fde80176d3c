//! EmbedBootstrap - one widget instance per page
//!
//! `init` claims the fixed root element by setting a mount marker on it.
//! A root that already carries the marker means the widget is mounted and
//! the call is a no-op. If the host re-rendered and dropped the root, the
//! next `init` mounts a fresh instance and shuts the stale one down.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use uuid::Uuid;
use widget_core::{
    GlobalWidgetConfig, WidgetConfig, GLOBAL_CONFIG_NAME, SCRIPT_ENDPOINT_ATTRIBUTE,
};
use widget_gateway::{ConfigResolver, HttpGateway};
use widget_runtime::{ControllerOptions, WidgetController};

use crate::error::EmbedError;
use crate::host::{DomEvent, DomListener, HostPage, RootClaim, StyleTarget};
use crate::styles::{scope_css, WIDGET_STYLES};

/// Id of the element hosting the widget.
pub const ROOT_ELEMENT_ID: &str = "kalibry-chat-widget-root";

/// Attribute set on the root once a widget is mounted in it.
pub const MOUNT_MARKER_ATTRIBUTE: &str = "data-kalibry-widget-mounted";

/// Global name under which the host can trigger a (re)mount.
pub const REINIT_FUNCTION_NAME: &str = "KalibryChatWidget.init";

#[derive(Debug, Clone)]
pub struct EmbedOptions {
    /// Endpoint given directly by the embedder; beats every other source.
    pub endpoint_url: Option<String>,
    /// Endpoint baked in at compile time.
    pub build_time_url: Option<String>,
    /// Overrides the gateway's 30 s default.
    pub request_timeout: Option<Duration>,
    pub controller: ControllerOptions,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            build_time_url: option_env!("CHAT_API_URL").map(str::to_string),
            request_timeout: None,
            controller: ControllerOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Mounted { instance_id: Uuid },
    AlreadyMounted,
}

struct MountedWidget {
    instance_id: Uuid,
    controller: WidgetController,
    gateway: Arc<HttpGateway>,
}

pub struct EmbedBootstrap {
    page: Arc<dyn HostPage>,
    options: EmbedOptions,
    mounted: Mutex<Option<MountedWidget>>,
}

impl EmbedBootstrap {
    pub fn new(page: Arc<dyn HostPage>, options: EmbedOptions) -> Arc<Self> {
        Arc::new(Self {
            page,
            options,
            mounted: Mutex::new(None),
        })
    }

    /// Expose the re-init function and, unless the host set
    /// `AUTO_INIT: false`, mount once the page is ready.
    pub fn install(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.page.expose_function(
            REINIT_FUNCTION_NAME,
            Arc::new(move || {
                if let Some(bootstrap) = weak.upgrade() {
                    bootstrap.init_logged();
                }
            }),
        );

        let auto_init = self
            .host_config()
            .map_or(true, |config| config.auto_init_enabled());
        if !auto_init {
            log::info!(
                "Auto-init disabled by {}; waiting for {}()",
                GLOBAL_CONFIG_NAME,
                REINIT_FUNCTION_NAME
            );
            return;
        }

        let weak = Arc::downgrade(self);
        self.page.on_ready(Box::new(move || {
            if let Some(bootstrap) = weak.upgrade() {
                bootstrap.init_logged();
            }
        }));
    }

    /// Mount the widget unless it is already mounted.
    pub fn init(&self) -> Result<InitOutcome, EmbedError> {
        let mut mounted = self.mounted.lock();

        if self.page.claim_root(ROOT_ELEMENT_ID, MOUNT_MARKER_ATTRIBUTE)?
            == RootClaim::AlreadyMounted
        {
            log::warn!("Chat widget already mounted in #{}; init ignored", ROOT_ELEMENT_ID);
            return Ok(InitOutcome::AlreadyMounted);
        }

        if let Some(stale) = mounted.take() {
            log::info!(
                "Widget root was replaced by the host; unmounting instance {}",
                stale.instance_id
            );
            stale.controller.shutdown();
        }

        match self.mount() {
            Ok(widget) => {
                let instance_id = widget.instance_id;
                log::info!("Chat widget {} mounted in #{}", instance_id, ROOT_ELEMENT_ID);
                *mounted = Some(widget);
                Ok(InitOutcome::Mounted { instance_id })
            }
            Err(e) => {
                self.page.release_root(ROOT_ELEMENT_ID, MOUNT_MARKER_ATTRIBUTE);
                Err(e)
            }
        }
    }

    /// Shut the mounted instance down and free the root for a later `init`.
    pub fn unmount(&self) {
        let Some(widget) = self.mounted.lock().take() else {
            return;
        };
        widget.controller.shutdown();
        self.page.release_root(ROOT_ELEMENT_ID, MOUNT_MARKER_ATTRIBUTE);
        log::info!("Chat widget {} unmounted", widget.instance_id);
    }

    pub fn controller(&self) -> Option<WidgetController> {
        self.mounted.lock().as_ref().map(|w| w.controller.clone())
    }

    pub fn instance_id(&self) -> Option<Uuid> {
        self.mounted.lock().as_ref().map(|w| w.instance_id)
    }

    /// The mounted gateway's session config; resolves the endpoint if no
    /// request has done so yet.
    pub fn endpoint_config(&self) -> Option<WidgetConfig> {
        let gateway = self.mounted.lock().as_ref().map(|w| Arc::clone(&w.gateway))?;
        gateway.config().cloned()
    }

    fn init_logged(&self) {
        if let Err(e) = self.init() {
            log::error!("Failed to initialize chat widget: {}", e);
        }
    }

    fn host_config(&self) -> Option<GlobalWidgetConfig> {
        self.page
            .global_config()
            .as_ref()
            .and_then(GlobalWidgetConfig::from_value)
    }

    fn resolver(&self) -> ConfigResolver {
        ConfigResolver::new()
            .with_explicit_url(self.options.endpoint_url.clone())
            .with_build_time_url(self.options.build_time_url.clone())
            .with_global_config(self.host_config())
            .with_script_attribute(self.page.script_attribute(SCRIPT_ENDPOINT_ATTRIBUTE))
    }

    fn mount(&self) -> Result<MountedWidget, EmbedError> {
        let target = self.page.attach_boundary(ROOT_ELEMENT_ID)?;
        let css = match target {
            StyleTarget::Boundary => WIDGET_STYLES.to_string(),
            StyleTarget::Document => {
                log::warn!("Host page has no isolation boundary; injecting scoped styles");
                scope_css(WIDGET_STYLES, &format!("#{}", ROOT_ELEMENT_ID))
            }
        };
        self.page.inject_style(ROOT_ELEMENT_ID, target, &css)?;

        let mut gateway = HttpGateway::new(self.resolver());
        if let Some(timeout) = self.options.request_timeout {
            gateway = gateway.with_timeout(timeout);
        }
        let gateway = Arc::new(gateway);
        let controller = WidgetController::new(gateway.clone(), self.options.controller.clone());

        self.page
            .bind_listener(ROOT_ELEMENT_ID, event_listener(controller.clone()))?;

        Ok(MountedWidget {
            instance_id: Uuid::new_v4(),
            controller,
            gateway,
        })
    }
}

/// Route DOM events from the widget subtree to the controller.
fn event_listener(controller: WidgetController) -> DomListener {
    Arc::new(move |event: DomEvent| {
        if let DomEvent::InputChanged(text) = event {
            controller.set_input(text);
            return;
        }
        // timers and exchanges are spawned onto the caller's runtime
        if tokio::runtime::Handle::try_current().is_err() {
            log::error!("{:?} dispatched outside the async runtime; ignored", event);
            return;
        }
        match event {
            DomEvent::LauncherClicked => controller.toggle(),
            DomEvent::CloseClicked => controller.close(),
            DomEvent::FormSubmitted => {
                if let Err(rejected) = controller.submit() {
                    log::debug!("Form submit ignored: {}", rejected);
                }
            }
            DomEvent::InputChanged(_) => {}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPage;

    fn options() -> EmbedOptions {
        EmbedOptions {
            build_time_url: None,
            ..EmbedOptions::default()
        }
    }

    #[test]
    fn second_init_is_a_no_op() {
        let page = Arc::new(MemoryPage::new());
        let bootstrap = EmbedBootstrap::new(page.clone(), options());

        assert!(matches!(bootstrap.init(), Ok(InitOutcome::Mounted { .. })));
        let first = bootstrap.instance_id();
        assert_eq!(bootstrap.init(), Ok(InitOutcome::AlreadyMounted));

        assert_eq!(bootstrap.instance_id(), first);
        assert_eq!(page.elements_with_id(ROOT_ELEMENT_ID), 1);
        assert_eq!(page.listener_count(ROOT_ELEMENT_ID), 1);
        assert_eq!(page.effective_styles(ROOT_ELEMENT_ID).len(), 1);
    }

    #[test]
    fn unmount_frees_the_root() {
        let page = Arc::new(MemoryPage::new());
        let bootstrap = EmbedBootstrap::new(page.clone(), options());
        bootstrap.init().unwrap();
        let controller = bootstrap.controller().unwrap();

        bootstrap.unmount();

        assert!(controller.is_unmounted());
        assert!(bootstrap.controller().is_none());
        assert!(page.attribute(ROOT_ELEMENT_ID, MOUNT_MARKER_ATTRIBUTE).is_none());
        assert!(matches!(bootstrap.init(), Ok(InitOutcome::Mounted { .. })));
    }

    #[test]
    fn explicit_endpoint_wins() {
        let page = Arc::new(
            MemoryPage::new()
                .with_script_attribute(SCRIPT_ENDPOINT_ATTRIBUTE, "https://script.example.com"),
        );
        let bootstrap = EmbedBootstrap::new(
            page,
            EmbedOptions {
                endpoint_url: Some("https://explicit.example.com".into()),
                ..options()
            },
        );
        bootstrap.init().unwrap();
        assert_eq!(
            bootstrap.endpoint_config().unwrap().endpoint_url,
            "https://explicit.example.com"
        );
    }

    #[test]
    fn no_endpoint_still_mounts() {
        let bootstrap = EmbedBootstrap::new(Arc::new(MemoryPage::new()), options());
        assert!(matches!(bootstrap.init(), Ok(InitOutcome::Mounted { .. })));
        assert!(bootstrap.endpoint_config().is_none());
    }
}
