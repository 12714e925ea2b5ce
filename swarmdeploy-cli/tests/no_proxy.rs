use predicates::prelude::*;

mod common;

const TRAEFIK_STACK: &str = r#"
services:
  api:
    image: ghcr.io/statechecker/statechecker-server:latest
    networks:
      - backend
      - traefik
    deploy:
      labels:
        - traefik.enable=true
        - traefik.http.routers.sc-api.rule=Host(`api.example.com`)
  web:
    image: ghcr.io/statechecker/statechecker-web:latest
    networks:
      - traefik
networks:
  backend:
    driver: overlay
  traefik:
    external: true
"#;

#[test]
fn test_rewrite_to_stdout() {
    let mut ctx = common::swarmdeploy();
    let input = ctx.write("traefik.yml", TRAEFIK_STACK);
    ctx.cmd.arg("no-proxy").arg(&input).args(["--web-port", "18080"]);
    ctx.cmd
        .assert()
        .success()
        .stdout(predicate::str::contains("traefik").not())
        .stdout(predicate::str::contains("8787:8787"))
        .stdout(predicate::str::contains("18080:80"));
}

#[test]
fn test_rewrite_is_idempotent() {
    let ctx = common::swarmdeploy();
    let input = ctx.write("traefik.yml", TRAEFIK_STACK);
    let once = ctx.path("once.yml");
    let twice = ctx.path("twice.yml");

    ctx.new_cmd()
        .arg("no-proxy")
        .arg(&input)
        .arg("-o")
        .arg(&once)
        .assert()
        .success();
    ctx.new_cmd()
        .arg("no-proxy")
        .arg(&once)
        .arg("-o")
        .arg(&twice)
        .assert()
        .success();

    assert_eq!(ctx.read("once.yml"), ctx.read("twice.yml"));
}

#[test]
fn test_stack_without_api_fails() {
    let mut ctx = common::swarmdeploy();
    let input = ctx.write("bad.yml", "services:\n  web:\n    image: nginx\n");
    ctx.cmd.arg("no-proxy").arg(&input);
    ctx.cmd
        .assert()
        .failure()
        .stderr(predicate::str::contains("api"));
}
