// Table and index definitions. Timestamps are Unix milliseconds; list-valued
// columns hold JSON arrays as TEXT; `data` columns hold versioned JSON blobs.

pub(super) const SCHEMA_VERSION: i64 = 1;

pub(super) const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS schema_version (key TEXT PRIMARY KEY, value INTEGER NOT NULL)",
    r#"
    CREATE TABLE IF NOT EXISTS cluster_snapshots (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        captured_at INTEGER NOT NULL,
        data BLOB NOT NULL,
        created_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER) * 1000)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS deployments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        snapshot_id INTEGER NOT NULL REFERENCES cluster_snapshots(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        namespace TEXT NOT NULL,
        created_time INTEGER,
        replicas INTEGER,
        ready_replicas INTEGER,
        updated_replicas INTEGER,
        data BLOB NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pods (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        snapshot_id INTEGER NOT NULL REFERENCES cluster_snapshots(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        namespace TEXT NOT NULL,
        deployment_name TEXT,
        created_time INTEGER,
        phase TEXT,
        node_name TEXT,
        restart_count INTEGER,
        cpu_request TEXT,
        cpu_limit TEXT,
        memory_request TEXT,
        memory_limit TEXT,
        storage_request TEXT,
        data BLOB NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS nodes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        snapshot_id INTEGER NOT NULL REFERENCES cluster_snapshots(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        created_time INTEGER,
        ready INTEGER NOT NULL,
        cpu_capacity TEXT,
        memory_capacity TEXT,
        storage_capacity TEXT,
        cpu_allocatable TEXT,
        memory_allocatable TEXT,
        storage_allocatable TEXT,
        os_image TEXT,
        kernel_version TEXT,
        kubelet_version TEXT,
        data BLOB NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS services (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        snapshot_id INTEGER NOT NULL REFERENCES cluster_snapshots(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        namespace TEXT NOT NULL,
        created_time INTEGER,
        type TEXT,
        cluster_ip TEXT,
        external_ips TEXT,
        data BLOB NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ingresses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        snapshot_id INTEGER NOT NULL REFERENCES cluster_snapshots(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        namespace TEXT NOT NULL,
        created_time INTEGER,
        hosts TEXT,
        data BLOB NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS configmaps (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        snapshot_id INTEGER NOT NULL REFERENCES cluster_snapshots(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        namespace TEXT NOT NULL,
        created_time INTEGER,
        data_keys TEXT,
        data BLOB NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS secrets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        snapshot_id INTEGER NOT NULL REFERENCES cluster_snapshots(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        namespace TEXT NOT NULL,
        created_time INTEGER,
        type TEXT,
        data_keys TEXT,
        data BLOB NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS persistent_volumes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        snapshot_id INTEGER NOT NULL REFERENCES cluster_snapshots(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        created_time INTEGER,
        capacity TEXT,
        access_modes TEXT,
        reclaim_policy TEXT,
        storage_class TEXT,
        status TEXT,
        volume_source TEXT,
        data BLOB NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS persistent_volume_claims (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        snapshot_id INTEGER NOT NULL REFERENCES cluster_snapshots(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        namespace TEXT NOT NULL,
        created_time INTEGER,
        requested_size TEXT,
        access_modes TEXT,
        storage_class TEXT,
        status TEXT,
        volume_name TEXT,
        data BLOB NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_snapshots_captured_at ON cluster_snapshots(captured_at)",
    "CREATE INDEX IF NOT EXISTS idx_deployments_namespace ON deployments(namespace)",
    "CREATE INDEX IF NOT EXISTS idx_deployments_name ON deployments(name)",
    "CREATE INDEX IF NOT EXISTS idx_deployments_snapshot ON deployments(snapshot_id)",
    "CREATE INDEX IF NOT EXISTS idx_pods_namespace ON pods(namespace)",
    "CREATE INDEX IF NOT EXISTS idx_pods_name ON pods(name)",
    "CREATE INDEX IF NOT EXISTS idx_pods_deployment ON pods(deployment_name)",
    "CREATE INDEX IF NOT EXISTS idx_pods_node ON pods(node_name)",
    "CREATE INDEX IF NOT EXISTS idx_pods_snapshot ON pods(snapshot_id)",
    "CREATE INDEX IF NOT EXISTS idx_nodes_name ON nodes(name)",
    "CREATE INDEX IF NOT EXISTS idx_nodes_snapshot ON nodes(snapshot_id)",
    "CREATE INDEX IF NOT EXISTS idx_services_namespace ON services(namespace)",
    "CREATE INDEX IF NOT EXISTS idx_services_name ON services(name)",
    "CREATE INDEX IF NOT EXISTS idx_services_snapshot ON services(snapshot_id)",
    "CREATE INDEX IF NOT EXISTS idx_ingresses_namespace ON ingresses(namespace)",
    "CREATE INDEX IF NOT EXISTS idx_ingresses_name ON ingresses(name)",
    "CREATE INDEX IF NOT EXISTS idx_ingresses_snapshot ON ingresses(snapshot_id)",
    "CREATE INDEX IF NOT EXISTS idx_configmaps_namespace ON configmaps(namespace)",
    "CREATE INDEX IF NOT EXISTS idx_configmaps_name ON configmaps(name)",
    "CREATE INDEX IF NOT EXISTS idx_configmaps_snapshot ON configmaps(snapshot_id)",
    "CREATE INDEX IF NOT EXISTS idx_secrets_namespace ON secrets(namespace)",
    "CREATE INDEX IF NOT EXISTS idx_secrets_name ON secrets(name)",
    "CREATE INDEX IF NOT EXISTS idx_secrets_snapshot ON secrets(snapshot_id)",
    "CREATE INDEX IF NOT EXISTS idx_persistent_volumes_name ON persistent_volumes(name)",
    "CREATE INDEX IF NOT EXISTS idx_persistent_volumes_snapshot ON persistent_volumes(snapshot_id)",
    "CREATE INDEX IF NOT EXISTS idx_persistent_volume_claims_namespace ON persistent_volume_claims(namespace)",
    "CREATE INDEX IF NOT EXISTS idx_persistent_volume_claims_name ON persistent_volume_claims(name)",
    "CREATE INDEX IF NOT EXISTS idx_persistent_volume_claims_snapshot ON persistent_volume_claims(snapshot_id)",
];
