//! Demo fleet used when no live source has been reached yet

use crate::models::{
    Container, ContainerStatus, DockerImage, DockerVolume, HealthStatus, RestartPolicy, Role,
    User, Volume, VolumeState,
};
use std::collections::BTreeMap;

struct Spec<'a> {
    id: &'a str,
    name: &'a str,
    image: &'a str,
    status: ContainerStatus,
    health: HealthStatus,
    created: &'a str,
    uptime: &'a str,
    port: &'a str,
    cpu: f64,
    cpu_limit: f64,
    memory: f64,
    memory_limit: f64,
    logs: &'a [&'a str],
    env: &'a [(&'a str, &'a str)],
    volumes: &'a [(&'a str, &'a str, &'a str)],
    restart_policy: RestartPolicy,
}

impl Spec<'_> {
    fn build(&self) -> Container {
        let mut container = Container {
            id: self.id.to_string(),
            name: self.name.to_string(),
            image: self.image.to_string(),
            status: self.status,
            health: self.health,
            created: self.created.to_string(),
            uptime: self.uptime.to_string(),
            port: self.port.to_string(),
            cpu: self.cpu,
            cpu_limit: self.cpu_limit,
            memory: self.memory,
            memory_limit: self.memory_limit,
            logs: self.logs.iter().map(|l| l.to_string()).collect(),
            env_vars: self
                .env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            volumes: self
                .volumes
                .iter()
                .map(|(host, mount, mode)| Volume {
                    host_path: host.to_string(),
                    mount_path: mount.to_string(),
                    mode: mode.to_string(),
                })
                .collect(),
            restart_policy: self.restart_policy,
        };
        container.settle_if_not_running();
        container
    }
}

pub fn demo_containers() -> Vec<Container> {
    use ContainerStatus::*;
    use HealthStatus as H;

    let specs = [
        Spec {
            id: "c1d2e3f4g5h6",
            name: "web-server-nginx",
            image: "nginx:latest",
            status: Running,
            health: H::Healthy,
            created: "2023-10-25T08:00:00Z",
            uptime: "2 days",
            port: "80:80",
            cpu: 1.2,
            cpu_limit: 50.0,
            memory: 45.0,
            memory_limit: 512.0,
            logs: &[
                "[info] Starting nginx...",
                "[info] Listening on 80",
                "[info] Request from 192.168.1.5",
                "[info] Request from 10.0.0.2",
            ],
            env: &[("NGINX_HOST", "localhost"), ("NGINX_PORT", "80"), ("TZ", "UTC")],
            volumes: &[
                ("/var/www/html", "/usr/share/nginx/html", "ro"),
                ("/etc/nginx/conf.d", "/etc/nginx/conf.d", "rw"),
            ],
            restart_policy: RestartPolicy::Always,
        },
        Spec {
            id: "a1b2c3d4e5f6",
            name: "api-gateway",
            image: "node:18-alpine",
            status: Running,
            health: H::Healthy,
            created: "2023-10-27T10:30:00Z",
            uptime: "5 hours",
            port: "3000:3000",
            cpu: 12.5,
            cpu_limit: 100.0,
            memory: 120.0,
            memory_limit: 1024.0,
            logs: &[
                "Server started on 3000",
                "Connected to DB",
                "Handling GET /api/v1/users",
                "Auth successful",
            ],
            env: &[
                ("NODE_ENV", "production"),
                ("DB_HOST", "postgres-db"),
                ("JWT_SECRET", "super-secret-key-change-me"),
            ],
            volumes: &[("/usr/src/app/logs", "/logs", "rw")],
            restart_policy: RestartPolicy::OnFailure,
        },
        Spec {
            id: "z9y8x7w6v5u4",
            name: "postgres-db",
            image: "postgres:14",
            status: Running,
            health: H::Starting,
            created: "2023-10-20T14:15:00Z",
            uptime: "1 week",
            port: "5432:5432",
            cpu: 5.8,
            cpu_limit: 200.0,
            memory: 450.0,
            memory_limit: 2048.0,
            logs: &["DB system is ready to accept connections", "Vacuum completed"],
            env: &[
                ("POSTGRES_USER", "admin"),
                ("POSTGRES_PASSWORD", "password123"),
                ("POSTGRES_DB", "main_db"),
            ],
            volumes: &[("pg_data", "/var/lib/postgresql/data", "rw")],
            restart_policy: RestartPolicy::Always,
        },
        Spec {
            id: "x1x2x3x4x5x6",
            name: "worker-queue",
            image: "python:3.9",
            status: Error,
            health: H::None,
            created: "2023-10-27T15:00:00Z",
            uptime: "10 mins",
            port: "-",
            cpu: 0.0,
            cpu_limit: 100.0,
            memory: 0.0,
            memory_limit: 512.0,
            logs: &[
                "Starting worker...",
                "Error: Connection refused to Redis",
                "Retrying...",
                "Critical Exception: Max retries exceeded",
                "Process exited with code 1",
            ],
            env: &[("REDIS_URL", "redis://localhost:6379"), ("QUEUE_NAME", "high-priority")],
            volumes: &[],
            restart_policy: RestartPolicy::No,
        },
        Spec {
            id: "r4d1s5cache99",
            name: "redis-cache",
            image: "redis:alpine",
            status: Running,
            health: H::Healthy,
            created: "2023-10-24T09:00:00Z",
            uptime: "3 days",
            port: "6379:6379",
            cpu: 0.8,
            cpu_limit: 50.0,
            memory: 25.0,
            memory_limit: 256.0,
            logs: &[
                "Ready to accept connections",
                "Background saving started",
                "DB saved on disk",
            ],
            env: &[],
            volumes: &[],
            restart_policy: RestartPolicy::UnlessStopped,
        },
        Spec {
            id: "m0ng0db77889",
            name: "mongo-store",
            image: "mongo:5.0",
            status: Stopped,
            health: H::None,
            created: "2023-10-10T11:20:00Z",
            uptime: "2 weeks",
            port: "27017:27017",
            cpu: 0.0,
            cpu_limit: 200.0,
            memory: 0.0,
            memory_limit: 1024.0,
            logs: &[" shutting down...", "shutdown complete"],
            env: &[],
            volumes: &[("mongo_data", "/data/db", "rw")],
            restart_policy: RestartPolicy::Always,
        },
        Spec {
            id: "k8s99metrics00",
            name: "metrics-collector",
            image: "prom/prometheus",
            status: Running,
            health: H::Healthy,
            created: "2023-10-27T11:30:00Z",
            uptime: "4 hours",
            port: "9090:9090",
            cpu: 3.4,
            cpu_limit: 100.0,
            memory: 180.0,
            memory_limit: 1024.0,
            logs: &["Server is ready to receive web requests."],
            env: &[],
            volumes: &[],
            restart_policy: RestartPolicy::Always,
        },
        Spec {
            id: "graf55ana443",
            name: "grafana-ui",
            image: "grafana/grafana",
            status: Running,
            health: H::Healthy,
            created: "2023-10-27T11:30:00Z",
            uptime: "4 hours",
            port: "3001:3000",
            cpu: 1.5,
            cpu_limit: 100.0,
            memory: 160.0,
            memory_limit: 512.0,
            logs: &["HTTP Server Listen"],
            env: &[],
            volumes: &[],
            restart_policy: RestartPolicy::Always,
        },
    ];

    specs.iter().map(Spec::build).collect()
}

pub fn demo_users() -> Vec<User> {
    vec![
        User {
            id: "1".to_string(),
            username: "admin".to_string(),
            role: Role::Admin,
            avatar: "https://api.dicebear.com/7.x/avataaars/svg?seed=Admin".to_string(),
            password: "admin".to_string(),
            created: "2023-01-15T08:00:00Z".to_string(),
        },
        User {
            id: "2".to_string(),
            username: "viewer".to_string(),
            role: Role::Viewer,
            avatar: "https://api.dicebear.com/7.x/avataaars/svg?seed=Viewer".to_string(),
            password: "view".to_string(),
            created: "2023-03-10T14:30:00Z".to_string(),
        },
    ]
}

pub fn demo_images() -> Vec<DockerImage> {
    [
        ("sha256:7f553e89", "nginx", "latest", "142MB", "3 weeks ago"),
        ("sha256:8a12b3c4", "node", "18-alpine", "176MB", "2 days ago"),
        ("sha256:9c45d6e7", "postgres", "14", "350MB", "1 month ago"),
        ("sha256:1f2e3d4c", "python", "3.9", "890MB", "5 days ago"),
        ("sha256:5g6h7i8j", "redis", "alpine", "32MB", "2 months ago"),
    ]
    .iter()
    .map(|(id, repository, tag, size, created)| DockerImage {
        id: id.to_string(),
        repository: repository.to_string(),
        tag: tag.to_string(),
        size: size.to_string(),
        created: created.to_string(),
    })
    .collect()
}

pub fn demo_volumes() -> Vec<DockerVolume> {
    [
        ("pg_data", "1 week ago", VolumeState::InUse),
        ("logs_vol", "5 hours ago", VolumeState::InUse),
        ("unused_config", "3 months ago", VolumeState::Available),
    ]
    .iter()
    .map(|(name, created, status)| DockerVolume {
        name: name.to_string(),
        driver: "local".to_string(),
        mountpoint: format!("/var/lib/docker/volumes/{}/_data", name),
        created: created.to_string(),
        status: *status,
    })
    .collect()
}
