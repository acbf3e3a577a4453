use serde::Deserialize;
use tide::http::StatusCode;
use tide::{Redirect, Request, Response};

use crate::models::photos::{NewPhoto, PhotoId};

pub mod utils;

pub(in super::super) fn mount(route: &mut tide::Server<crate::State>) {
    route.at("/").get(Redirect::see_other("/photos"));

    route.at("/photos").get(index).post(create_row);
    route.at("/photos/new").get(new_form);

    route.at("/photos/:the_id").get(show).post(update_row);
    route.at("/photos/:the_id/edit").get(edit_form);
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PhotoForm {
    da_source: String,
    da_caption: String,
}

fn base_context(state: &crate::State, title: &str, path: &str) -> tera::Context {
    let mut context = tera::Context::new();
    context.insert("cache_buster", &state.cache_busting_string);
    context.insert("title", title);
    context.insert("canonical_href", &format!("{}{}", state.args.base_url, path));
    context
}

fn html_response(
    state: &crate::State,
    status: StatusCode,
    template: &str,
    context: &tera::Context,
) -> tide::Result<Response> {
    let body = state.renderer.render(template, context)?;
    let res = Response::builder(status)
        .content_type("text/html")
        .body(body)
        .build();
    Ok(res)
}

fn not_found() -> tide::Result<Response> {
    Ok(Response::builder(StatusCode::NotFound).build())
}

fn photo_id(req: &Request<crate::State>) -> Option<PhotoId> {
    super::parse_photo_id(req.param("the_id").ok()?)
}

async fn index(req: Request<crate::State>) -> tide::Result<Response> {
    let state = req.state();

    let photos = state.store.get_all_photos().await?;

    let mut context = base_context(state, "photos", "/photos");
    context.insert("photos", &photos);

    html_response(state, StatusCode::Ok, "photos/index.html", &context)
}

async fn show(req: Request<crate::State>) -> tide::Result<Response> {
    let state = req.state();

    let photo_id = match photo_id(&req) {
        Some(id) => id,
        None => return not_found(),
    };

    let photo = match state.store.get_photo_by_id(photo_id).await? {
        Some(photo) => photo,
        None => return not_found(),
    };

    let title = if photo.caption.is_empty() {
        "Untitled"
    } else {
        photo.caption.as_str()
    };
    let mut context = base_context(state, title, &format!("/photos/{}", photo.id));
    context.insert("photo", &photo);

    html_response(state, StatusCode::Ok, "photos/show.html", &context)
}

async fn new_form(req: Request<crate::State>) -> tide::Result<Response> {
    let state = req.state();
    let context = base_context(state, "new photo", "/photos/new");

    html_response(state, StatusCode::Ok, "photos/new_form.html", &context)
}

async fn create_row(mut req: Request<crate::State>) -> tide::Result<Response> {
    let form: PhotoForm = req.body_form().await?;
    tide::log::debug!("Received photo form: {:?}", form);

    let state = req.state();

    let new_photo = match NewPhoto::new(form.da_source.clone(), form.da_caption.clone()) {
        Ok(photo) => photo,
        Err(err) => {
            tide::log::info!("rejected new photo: {}", err);
            let mut context = base_context(state, "new photo", "/photos/new");
            context.insert("error", &err.to_string());
            context.insert("source", &form.da_source);
            context.insert("caption", &form.da_caption);
            return html_response(
                state,
                StatusCode::UnprocessableEntity,
                "photos/new_form.html",
                &context,
            );
        },
    };

    let id = state.store.insert_photo(&new_photo).await?;
    tide::log::info!("created photo {}", id);

    Ok(Redirect::see_other(format!("/photos/{}", id)).into())
}

async fn edit_form(req: Request<crate::State>) -> tide::Result<Response> {
    let state = req.state();

    let photo_id = match photo_id(&req) {
        Some(id) => id,
        None => return not_found(),
    };

    let photo = match state.store.get_photo_by_id(photo_id).await? {
        Some(photo) => photo,
        None => return not_found(),
    };

    let mut context = base_context(state, "edit photo", &format!("/photos/{}/edit", photo.id));
    context.insert("photo_id", &photo.id);
    context.insert("source", &photo.source);
    context.insert("caption", &photo.caption);

    html_response(state, StatusCode::Ok, "photos/edit_form.html", &context)
}

async fn update_row(mut req: Request<crate::State>) -> tide::Result<Response> {
    let photo_id = match photo_id(&req) {
        Some(id) => id,
        None => return not_found(),
    };

    let form: PhotoForm = req.body_form().await?;
    tide::log::debug!("Received photo form: {:?}", form);

    let state = req.state();

    let new_photo = match NewPhoto::new(form.da_source.clone(), form.da_caption.clone()) {
        Ok(photo) => photo,
        Err(err) => {
            if state.store.get_photo_by_id(photo_id).await?.is_none() {
                return not_found();
            }

            tide::log::info!("rejected update of photo {}: {}", photo_id, err);
            let mut context =
                base_context(state, "edit photo", &format!("/photos/{}/edit", photo_id));
            context.insert("error", &err.to_string());
            context.insert("photo_id", &photo_id);
            context.insert("source", &form.da_source);
            context.insert("caption", &form.da_caption);
            return html_response(
                state,
                StatusCode::UnprocessableEntity,
                "photos/edit_form.html",
                &context,
            );
        },
    };

    if !state.store.update_photo(photo_id, &new_photo).await? {
        return not_found();
    }
    tide::log::info!("updated photo {}", photo_id);

    Ok(Redirect::see_other(format!("/photos/{}", photo_id)).into())
}

#[cfg(test)]
mod tests {
    use tide::http::StatusCode;

    use crate::db::PhotoStore;
    use crate::models::photos::NewPhoto;
    use crate::web::testing::{get, post_form, server};

    fn location(res: &tide::http::Response) -> String {
        res.header("Location").unwrap().last().as_str().to_string()
    }

    #[async_std::test]
    async fn root_redirects_to_list() {
        let (app, _) = server();

        let res = get(&app, "/").await;
        assert_eq!(res.status(), StatusCode::SeeOther);
        assert_eq!(location(&res), "/photos");
    }

    #[async_std::test]
    async fn empty_list_still_renders() {
        let (app, _) = server();

        let mut res = get(&app, "/photos").await;
        assert_eq!(res.status(), StatusCode::Ok);
        let body = res.body_string().await.unwrap();
        assert!(body.contains("No photos yet"));
    }

    #[async_std::test]
    async fn create_redirects_to_new_photo() {
        let (app, store) = server();

        let res = post_form(
            &app,
            "/photos",
            "da_source=http%3A%2F%2Fx%2Fa.jpg&da_caption=cat",
        )
        .await;
        assert_eq!(res.status(), StatusCode::SeeOther);
        assert_eq!(location(&res), "/photos/1");

        let photo = store.get_photo_by_id(1).await.unwrap().unwrap();
        assert_eq!(photo.source, "http://x/a.jpg");
        assert_eq!(photo.caption, "cat");

        let mut res = get(&app, "/photos/1").await;
        assert_eq!(res.status(), StatusCode::Ok);
        let body = res.body_string().await.unwrap();
        assert!(body.contains(r#"src="http:&#x2F;&#x2F;x&#x2F;a.jpg""#));
        assert!(body.contains("cat"));
    }

    #[async_std::test]
    async fn list_contains_every_created_photo() {
        let (app, _) = server();

        for caption in &["first", "second", "third"] {
            let body = format!("da_source=http%3A%2F%2Fx%2F{0}.jpg&da_caption={0}", caption);
            let res = post_form(&app, "/photos", &body).await;
            assert_eq!(res.status(), StatusCode::SeeOther);
        }

        let mut res = get(&app, "/photos").await;
        let body = res.body_string().await.unwrap();
        for caption in &["first", "second", "third"] {
            assert!(body.contains(&format!("http:&#x2F;&#x2F;x&#x2F;{}.jpg", caption)));
            assert!(body.contains(&format!(">{}<", caption)));
        }
    }

    #[async_std::test]
    async fn empty_source_is_rejected() {
        let (app, store) = server();

        let mut res = post_form(&app, "/photos", "da_source=++&da_caption=cat").await;
        assert_eq!(res.status(), StatusCode::UnprocessableEntity);
        let body = res.body_string().await.unwrap();
        assert!(body.contains("source must not be empty"));

        assert!(store.get_all_photos().await.unwrap().is_empty());
    }

    #[async_std::test]
    async fn empty_caption_is_accepted() {
        let (app, store) = server();

        let res = post_form(&app, "/photos", "da_source=http%3A%2F%2Fx%2Fa.jpg").await;
        assert_eq!(res.status(), StatusCode::SeeOther);

        let photo = store.get_photo_by_id(1).await.unwrap().unwrap();
        assert_eq!(photo.caption, "");
    }

    #[async_std::test]
    async fn missing_photo_is_not_found() {
        let (app, _) = server();

        assert_eq!(get(&app, "/photos/999").await.status(), StatusCode::NotFound);
        assert_eq!(get(&app, "/photos/abc").await.status(), StatusCode::NotFound);
        assert_eq!(get(&app, "/photos/999/edit").await.status(), StatusCode::NotFound);
    }

    #[async_std::test]
    async fn photo_has_a_single_url() {
        let (app, store) = server();
        let id = store
            .insert_photo(&NewPhoto::new("http://x/a.jpg".into(), "cat".into()).unwrap())
            .await
            .unwrap();
        assert_eq!(id, 1);

        assert_eq!(get(&app, "/photos/1").await.status(), StatusCode::Ok);
        assert_eq!(get(&app, "/photos/01").await.status(), StatusCode::NotFound);
        assert_eq!(get(&app, "/photos/+1").await.status(), StatusCode::NotFound);
        assert_eq!(get(&app, "/photos/01/edit").await.status(), StatusCode::NotFound);
    }

    #[async_std::test]
    async fn stylesheet_is_served() {
        let (app, _) = server();

        let mut res = get(&app, "/photos").await;
        let body = res.body_string().await.unwrap();
        assert!(body.contains("/static/style.css"));

        let res = get(&app, "/static/style.css").await;
        assert_eq!(res.status(), StatusCode::Ok);
    }

    #[async_std::test]
    async fn new_form_renders() {
        let (app, _) = server();

        let mut res = get(&app, "/photos/new").await;
        assert_eq!(res.status(), StatusCode::Ok);
        let body = res.body_string().await.unwrap();
        assert!(body.contains("da_source"));
        assert!(body.contains("da_caption"));
    }

    #[async_std::test]
    async fn edit_form_is_prefilled() {
        let (app, store) = server();
        let id = store
            .insert_photo(&NewPhoto::new("http://x/a.jpg".into(), "cat".into()).unwrap())
            .await
            .unwrap();

        let mut res = get(&app, &format!("/photos/{}/edit", id)).await;
        assert_eq!(res.status(), StatusCode::Ok);
        let body = res.body_string().await.unwrap();
        assert!(body.contains("http:&#x2F;&#x2F;x&#x2F;a.jpg"));
        assert!(body.contains("cat"));
    }

    #[async_std::test]
    async fn update_changes_photo_and_redirects() {
        let (app, store) = server();
        let id = store
            .insert_photo(&NewPhoto::new("http://x/a.jpg".into(), "cat".into()).unwrap())
            .await
            .unwrap();

        let res = post_form(
            &app,
            &format!("/photos/{}", id),
            "da_source=http%3A%2F%2Fx%2Fb.jpg&da_caption=dog",
        )
        .await;
        assert_eq!(res.status(), StatusCode::SeeOther);
        assert_eq!(location(&res), format!("/photos/{}", id));

        let photo = store.get_photo_by_id(id).await.unwrap().unwrap();
        assert_eq!(photo.source, "http://x/b.jpg");
        assert_eq!(photo.caption, "dog");
        assert_eq!(store.get_all_photos().await.unwrap().len(), 1);
    }

    #[async_std::test]
    async fn invalid_update_keeps_photo() {
        let (app, store) = server();
        let id = store
            .insert_photo(&NewPhoto::new("http://x/a.jpg".into(), "cat".into()).unwrap())
            .await
            .unwrap();

        let res = post_form(&app, &format!("/photos/{}", id), "da_source=&da_caption=dog").await;
        assert_eq!(res.status(), StatusCode::UnprocessableEntity);

        let photo = store.get_photo_by_id(id).await.unwrap().unwrap();
        assert_eq!(photo.source, "http://x/a.jpg");
        assert_eq!(photo.caption, "cat");
    }

    #[async_std::test]
    async fn update_of_missing_photo_is_not_found() {
        let (app, store) = server();

        let res = post_form(&app, "/photos/5", "da_source=http%3A%2F%2Fx%2Fb.jpg").await;
        assert_eq!(res.status(), StatusCode::NotFound);
        assert!(store.get_all_photos().await.unwrap().is_empty());
    }
}
