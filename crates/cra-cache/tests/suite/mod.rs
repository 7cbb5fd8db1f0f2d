mod resource_http;
