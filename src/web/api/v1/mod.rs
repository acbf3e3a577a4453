use std::convert::TryFrom;

use tide::{Request, Response};

use crate::models::photos::NewPhoto;
use photogram_api_structs::PhotoPayload;

pub(super) fn mount(mut route: tide::Route<crate::State>) {
    route.at("/photos").get(list_photos).post(create_photo);
    route.at("/photos/:the_id").get(get_photo);
}

async fn list_photos(req: Request<crate::State>) -> tide::Result<Response> {
    let state = req.state();

    let photos = state.store.get_all_photos().await?;

    let res = Response::builder(tide::http::StatusCode::Ok)
        .body(tide::Body::from_json(&photos)?)
        .build();
    Ok(res)
}

async fn get_photo(req: Request<crate::State>) -> tide::Result<Response> {
    let state = req.state();

    let photo_id = match crate::web::parse_photo_id(req.param("the_id")?) {
        Some(id) => id,
        None => return Ok(Response::builder(tide::http::StatusCode::NotFound).build()),
    };

    let photo = match state.store.get_photo_by_id(photo_id).await? {
        Some(photo) => photo,
        None => return Ok(Response::builder(tide::http::StatusCode::NotFound).build()),
    };

    let res = Response::builder(tide::http::StatusCode::Ok)
        .body(tide::Body::from_json(&photo)?)
        .build();
    Ok(res)
}

async fn create_photo(mut req: Request<crate::State>) -> tide::Result<Response> {
    let payload: PhotoPayload = req.body_json().await?;
    tide::log::debug!("Received photo payload: {:#?}", payload);

    let state = req.state();

    let new_photo = match NewPhoto::try_from(payload) {
        Ok(photo) => photo,
        Err(err) => {
            return Ok(Response::builder(tide::http::StatusCode::UnprocessableEntity)
                .body(tide::convert::json!({
                    "reason": err.to_string(),
                }))
                .build())
        },
    };

    let id = state.store.insert_photo(&new_photo).await?;
    let created_photo = state.store.get_photo_by_id(id).await?;

    Ok(Response::builder(tide::http::StatusCode::Created)
        .body(tide::convert::json!({
            "id": id,
            "created": created_photo,
        }))
        .build())
}
