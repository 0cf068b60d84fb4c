//! One route table for every façade: (method, path pattern, endpoint).

use crate::catalog::Catalog;
use axum::http::Method;

/// What a matched route does. Resource routes carry the resource name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    List(String),
    Read(String),
    Create(String),
    Update(String),
    Delete(String),
    Catalog,
    Describe,
    IsAdminLogin,
    AdminLogin,
    AdminLogout,
    NotifyContact,
}

#[derive(Clone, Debug)]
pub struct Route {
    pub method: Method,
    /// Relative to the API prefix; a `:name` segment captures one path segment.
    pub path: String,
    pub endpoint: Endpoint,
}

impl Route {
    fn new(method: Method, path: impl Into<String>, endpoint: Endpoint) -> Self {
        Route {
            method,
            path: path.into(),
            endpoint,
        }
    }

    /// Matches `segments` against the pattern, returning the captured value (if any).
    /// An empty segment (`/news/`, `//news`) matches nothing.
    fn capture<'a>(&self, segments: &[&'a str]) -> Option<Option<&'a str>> {
        let pattern: Vec<&str> = self.path.trim_start_matches('/').split('/').collect();
        if pattern.len() != segments.len() {
            return None;
        }
        let mut captured = None;
        for (p, s) in pattern.iter().zip(segments) {
            if p.starts_with(':') {
                if s.is_empty() {
                    return None;
                }
                captured = Some(*s);
            } else if s.is_empty() || p != s {
                return None;
            }
        }
        Some(captured)
    }
}

pub enum RouteMatch<'a> {
    Found {
        route: &'a Route,
        param: Option<String>,
    },
    /// `allow` is the value of the `Allow` header, e.g. `GET,HEAD,PUT,DELETE`.
    MethodNotAllowed { allow: String },
    NotFound,
}

#[derive(Clone, Debug)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn build(catalog: &Catalog) -> Self {
        let mut routes = Vec::new();
        for name in catalog.names() {
            let collection = format!("/{}", name);
            let item = format!("/{}/:id", name);
            routes.push(Route::new(Method::GET, collection.clone(), Endpoint::List(name.to_string())));
            routes.push(Route::new(Method::POST, collection, Endpoint::Create(name.to_string())));
            routes.push(Route::new(Method::GET, item.clone(), Endpoint::Read(name.to_string())));
            routes.push(Route::new(Method::PUT, item.clone(), Endpoint::Update(name.to_string())));
            routes.push(Route::new(Method::DELETE, item, Endpoint::Delete(name.to_string())));
        }
        routes.push(Route::new(Method::GET, "/ddl", Endpoint::Catalog));
        routes.push(Route::new(Method::GET, "/ddl/:name", Endpoint::Describe));
        routes.push(Route::new(Method::GET, "/isAdminLogin", Endpoint::IsAdminLogin));
        routes.push(Route::new(Method::POST, "/adminLogin", Endpoint::AdminLogin));
        routes.push(Route::new(Method::POST, "/adminLogout", Endpoint::AdminLogout));
        routes.push(Route::new(Method::POST, "/notifyContact", Endpoint::NotifyContact));
        RouteTable { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Match a path relative to the API prefix. Segments are percent-decoded; HEAD is
    /// served by the GET route of the same path.
    pub fn match_route(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let Some(rest) = path.strip_prefix('/') else {
            return RouteMatch::NotFound;
        };
        let decoded: Vec<String> = rest.split('/').map(percent_decode).collect();
        let segments: Vec<&str> = decoded.iter().map(String::as_str).collect();
        let wanted = if *method == Method::HEAD { &Method::GET } else { method };
        let mut allow: Vec<&str> = Vec::new();
        for route in &self.routes {
            if let Some(param) = route.capture(&segments) {
                if route.method == *wanted {
                    return RouteMatch::Found {
                        route,
                        param: param.map(str::to_string),
                    };
                }
                allow.push(route.method.as_str());
                if route.method == Method::GET {
                    allow.push(Method::HEAD.as_str());
                }
            }
        }
        if allow.is_empty() {
            RouteMatch::NotFound
        } else {
            RouteMatch::MethodNotAllowed { allow: allow.join(",") }
        }
    }
}

fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
