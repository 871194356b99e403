use crate::chat::ChatHelper;
use crate::cli::CommandLineArgs;
use crate::dashboard::{DashboardCatalog, QuickSight};
use crate::object_store::ObjectStore;
use crate::s3_client::S3Client;

use aws_config::BehaviorVersion;
use aws_types::region::Region;
use std::sync::Arc;

/// Shared application state passed to each request handler.
pub struct AppState {
    /// Command line arguments.
    pub args: CommandLineArgs,

    /// Object store holding the sensor files.
    pub store: Box<dyn ObjectStore>,

    /// Dashboard catalog, if an account is configured.
    pub dashboards: Option<Box<dyn DashboardCatalog>>,

    /// Question-answering helper.
    pub chat: ChatHelper,
}

impl AppState {
    /// Create and return an [AppState] backed by S3 and, when configured, QuickSight.
    pub async fn new(args: &CommandLineArgs) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(args.s3_region.clone()))
            .load()
            .await;
        let store = Box::new(S3Client::new(&sdk_config, args));
        let dashboards = args.quicksight_account_id.as_ref().map(|account_id| {
            Box::new(QuickSight::new(&sdk_config, account_id, args)) as Box<dyn DashboardCatalog>
        });
        if dashboards.is_none() {
            tracing::info!("no QuickSight account configured, dashboards disabled");
        }
        Self::with_parts(args, store, dashboards, ChatHelper::from_args(args))
    }

    /// Create an [AppState] from already constructed collaborators.
    pub fn with_parts(
        args: &CommandLineArgs,
        store: Box<dyn ObjectStore>,
        dashboards: Option<Box<dyn DashboardCatalog>>,
        chat: ChatHelper,
    ) -> Self {
        Self {
            args: args.clone(),
            store,
            dashboards,
            chat,
        }
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;
