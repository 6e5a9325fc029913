//! Bootstrap payload for launched instances.

/// Cloud-config script that installs nginx, starts it and writes a
/// placeholder page, so a freshly launched instance serves HTTP immediately.
pub fn nginx_cloud_config() -> String {
    "#cloud-config\n\
     package_update: true\n\
     packages:\n\
     \x20 - nginx\n\
     runcmd:\n\
     \x20 - echo '<h1>Instance OK</h1><p>Launched by Infra Tool.</p>' > /usr/share/nginx/html/index.html\n\
     \x20 - systemctl enable nginx\n\
     \x20 - systemctl start nginx\n"
        .to_string()
}
