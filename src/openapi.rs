//! OpenAPI document generated from the route table.

use crate::routes::{Endpoint, Route, RouteTable};
use axum::http::Method;
use std::collections::BTreeMap;
use utoipa::openapi::path::{
    HttpMethod, Operation, OperationBuilder, Parameter, ParameterBuilder, ParameterIn, PathItemBuilder,
    PathsBuilder,
};
use utoipa::openapi::schema::{ObjectBuilder, Type};
use utoipa::openapi::{InfoBuilder, OpenApi, OpenApiBuilder, Required, ResponseBuilder};

fn http_method(method: &Method) -> Option<HttpMethod> {
    Some(match *method {
        Method::GET => HttpMethod::Get,
        Method::POST => HttpMethod::Post,
        Method::PUT => HttpMethod::Put,
        Method::DELETE => HttpMethod::Delete,
        Method::PATCH => HttpMethod::Patch,
        _ => return None,
    })
}

fn param(name: &str, location: ParameterIn, required: bool, kind: Type, description: &str) -> Parameter {
    ParameterBuilder::new()
        .name(name)
        .parameter_in(location)
        .required(if required { Required::True } else { Required::False })
        .description(Some(description))
        .schema(Some(ObjectBuilder::new().schema_type(kind).build()))
        .build()
}

/// `/news/:id` becomes `/news/{id}`.
fn openapi_path(prefix: &str, path: &str) -> String {
    let templated: Vec<String> = path
        .split('/')
        .map(|s| match s.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name),
            None => s.to_string(),
        })
        .collect();
    format!("{}{}", prefix.trim_end_matches('/'), templated.join("/"))
}

fn operation(route: &Route) -> Operation {
    let (tag, summary, params): (&str, String, Vec<Parameter>) = match &route.endpoint {
        Endpoint::List(r) => (
            r,
            format!("List {} records", r),
            vec![
                param("page", ParameterIn::Query, false, Type::Integer, "page requested (defaults to 0)"),
                param("pagesize", ParameterIn::Query, false, Type::Integer, "number of records in a page (defaults to 20)"),
                param("order", ParameterIn::Query, false, Type::String, "db sort order column"),
            ],
        ),
        Endpoint::Read(r) => (r, format!("Get a {} record by id", r), vec![id_param()]),
        Endpoint::Create(r) => (r, format!("Add a {} record", r), vec![]),
        Endpoint::Update(r) => (r, format!("Update a {} record", r), vec![id_param()]),
        Endpoint::Delete(r) => (r, format!("Delete a {} record", r), vec![id_param()]),
        Endpoint::Catalog => ("TableInfo", "List table endpoints".into(), vec![]),
        Endpoint::Describe => (
            "TableInfo",
            "Get table info by name".into(),
            vec![param("name", ParameterIn::Path, true, Type::String, "table name")],
        ),
        Endpoint::IsAdminLogin => ("Admin", "Whether an admin session is active".into(), vec![]),
        Endpoint::AdminLogin => (
            "Admin",
            "Log in as admin".into(),
            vec![
                param("username", ParameterIn::Query, true, Type::String, "admin user name"),
                param("password", ParameterIn::Query, true, Type::String, "admin password"),
            ],
        ),
        Endpoint::AdminLogout => ("Admin", "Log out".into(), vec![]),
        Endpoint::NotifyContact => (
            "Contact",
            "Send a contact message".into(),
            vec![
                param("name", ParameterIn::Query, true, Type::String, "sender name"),
                param("email", ParameterIn::Query, true, Type::String, "sender email"),
                param("feedback", ParameterIn::Query, true, Type::String, "message"),
            ],
        ),
    };
    let mut op = OperationBuilder::new()
        .tag(tag)
        .summary(Some(summary))
        .response("200", ResponseBuilder::new().description("OK").build())
        .response("400", ResponseBuilder::new().description("{code, message}").build());
    for p in params {
        op = op.parameter(p);
    }
    op.build()
}

fn id_param() -> Parameter {
    param("id", ParameterIn::Path, true, Type::Integer, "record id")
}

pub fn document(table: &RouteTable, prefix: &str) -> OpenApi {
    let mut grouped: BTreeMap<String, PathItemBuilder> = BTreeMap::new();
    for route in table.routes() {
        let Some(method) = http_method(&route.method) else { continue };
        let path = openapi_path(prefix, &route.path);
        let item = grouped.remove(&path).unwrap_or_default();
        grouped.insert(path, item.operation(method, operation(route)));
    }
    let paths = grouped
        .into_iter()
        .fold(PathsBuilder::new(), |paths, (path, item)| paths.path(path, item.build()));
    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(env!("CARGO_PKG_NAME"))
                .version(env!("CARGO_PKG_VERSION"))
                .description(Some(env!("CARGO_PKG_DESCRIPTION")))
                .build(),
        )
        .paths(paths.build())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::{builtin, resolve};

    #[test]
    fn paths_are_templated_and_prefixed() {
        assert_eq!(openapi_path("/api", "/news/:id"), "/api/news/{id}");
        assert_eq!(openapi_path("/", "/ddl"), "/ddl");
    }

    #[test]
    fn document_lists_every_route() {
        let catalog = Catalog::build(resolve(&builtin().unwrap()).unwrap()).unwrap();
        let doc = document(&RouteTable::build(&catalog), "/api");
        let v = serde_json::to_value(&doc).unwrap();
        let paths = v["paths"].as_object().unwrap();
        assert!(paths.contains_key("/api/news"));
        assert!(paths.contains_key("/api/ddl/{name}"));
        let item = &paths["/api/news/{id}"];
        assert!(item.get("get").is_some());
        assert!(item.get("put").is_some());
        assert!(item.get("delete").is_some());
        let list_params = paths["/api/news"]["get"]["parameters"].as_array().unwrap();
        assert_eq!(list_params.len(), 3);
    }
}
