/// HTTP transport over the page's fetch API
use futures::future::{FutureExt, LocalBoxFuture};
use gloo_net::http::Request;

use crate::remote::{HttpRequest, HttpResponse, Method, Transport};

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchTransport;

impl Transport for FetchTransport {
    fn send(&self, request: HttpRequest) -> LocalBoxFuture<'_, Result<HttpResponse, String>> {
        async move {
            let builder = match request.method {
                Method::Get => Request::get(&request.url),
                Method::Post => {
                    Request::post(&request.url).header("Content-Type", "application/json")
                }
            }
            .header("Accept", "application/json");

            let response = match request.body {
                Some(body) => {
                    let request = builder.body(body).map_err(|e| e.to_string())?;
                    request.send().await
                }
                None => builder.send().await,
            }
            .map_err(|e| e.to_string())?;

            let status = response.status();
            let body = response.text().await.map_err(|e| e.to_string())?;
            Ok(HttpResponse { status, body })
        }
        .boxed_local()
    }
}
